use std::fmt::Write;

use itree_schema::InfluenceTreeDoc;

/// Renders a tree document as an indented table, children under their parent.
pub fn render_tree(doc: &InfluenceTreeDoc) -> String {
    let mut out = String::new();
    match &doc.start {
        Some(start) => {
            let _ = writeln!(out, "influence tree: {start} -> {}", doc.goal);
        }
        None => {
            let _ = writeln!(out, "influence tree: {}", doc.goal);
        }
    }
    let _ = writeln!(
        out,
        "{:<5} {:<40} {:>10} {:>10} {:>10} {:>10}",
        "#", "pattern", "conf", "gain", "gini", "drop"
    );

    let roots: Vec<usize> = doc
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.parent_index < 0)
        .map(|(i, _)| i)
        .collect();
    for root in roots {
        write_subtree(doc, root, 0, &mut out);
    }

    if !doc.skipped.is_empty() {
        let _ = writeln!(out, "skipped: {}", doc.skipped.len());
    }
    out
}

fn write_subtree(doc: &InfluenceTreeDoc, index: usize, depth: usize, out: &mut String) {
    let node = &doc.nodes[index];
    let label = format!("{}{}", "  ".repeat(depth), node.key);
    let _ = writeln!(
        out,
        "{:<5} {:<40} {:>10.4} {:>10} {:>10.4} {:>10}",
        index,
        label,
        node.confidence,
        fmt_opt(node.confidence_gain),
        node.overall_gini,
        fmt_opt(node.gini_drop),
    );

    for (child, _) in doc
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.parent_index == index as i64)
    {
        write_subtree(doc, child, depth + 1, out);
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}
