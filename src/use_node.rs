// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! `use` and `symbol` expansion.

use crate::decimal::Decimal;
use crate::matrix::Matrix;
use crate::options::Options;
use crate::pipeline::RunReport;
use crate::tree::{Document, Node};
use crate::utils;

// Attributes that configure the `use` element itself and must not be
// transferred to the expanded content.
const USE_OWN_ATTRIBUTES: &[&str] = &[
    "x", "y", "width", "height", "href", "xlink:href", "transform", "id",
];

// Nested `use` chains deeper than this are treated as recursive.
const MAX_DEPTH: usize = 20;

/// The `use` pipeline stage: replaces every `use` element with the
/// referenced geometry under the `use`'s position and transform.
pub(crate) fn resolve_use(doc: &Document, _opts: &Options, report: &mut RunReport) {
    for _ in 0..MAX_DEPTH {
        let uses = doc.elements_by_tag_name("use");
        if uses.is_empty() {
            return;
        }

        let ids = doc.ids();
        let mut progressed = false;

        for use_node in uses {
            let entity = use_node.id().unwrap_or_else(|| "use".to_string());

            let target_id = match use_node.href_id() {
                Some(id) => id,
                None => {
                    log::warn!("Use '{}' has no usable href. Removed.", entity);
                    use_node.detach();
                    continue;
                }
            };

            let target = match ids.get(&target_id) {
                Some(target) => target.clone(),
                None => {
                    log::warn!(
                        "Use '{}' references missing element '{}'. Removed.",
                        entity,
                        target_id
                    );
                    use_node.detach();
                    continue;
                }
            };

            // A target that contains the `use` itself is recursive.
            if target.descendants().iter().any(|d| d.same_node(&use_node)) {
                log::warn!("Use '{}' is recursive. Removed.", entity);
                use_node.detach();
                continue;
            }

            expand(&use_node, &target, report);
            report.use_resolved += 1;
            progressed = true;
        }

        if !progressed {
            return;
        }
    }

    // Anything left after the depth cap is part of a reference cycle.
    for leftover in doc.elements_by_tag_name("use") {
        report.errors.push(format!(
            "use '{}' exceeded the nesting limit and was removed",
            leftover.id().unwrap_or_default()
        ));
        leftover.detach();
    }
}

fn expand(use_node: &Node, target: &Node, report: &mut RunReport) {
    let x = use_node.decimal_attribute("x", Decimal::zero());
    let y = use_node.decimal_attribute("y", Decimal::zero());

    let mut matrix = match use_node.parse_transform() {
        Ok(m) => m,
        Err(e) => {
            report.errors.push(format!(
                "use '{}' has an invalid transform: {}",
                use_node.id().unwrap_or_default(),
                e
            ));
            Matrix::identity(3)
        }
    };
    // Can't fail: both operands are 3×3.
    matrix = matrix.mul(&Matrix::translation(x, y)).unwrap();

    let replacement = if target.has_tag_name("symbol") || target.has_tag_name("svg") {
        // A symbol instantiates as a group of its children, with the
        // viewport transform derived from its viewBox and the `use` size.
        if let Some(view_box) = target
            .attribute("viewBox")
            .and_then(|v| utils::parse_view_box(&v))
        {
            let width = use_node.decimal_attribute("width", view_box.width().clone());
            let height = use_node.decimal_attribute("height", view_box.height().clone());
            let viewport = utils::view_box_to_transform(&view_box, &width, &height);
            // Can't fail: both operands are 3×3.
            matrix = matrix.mul(&viewport).unwrap();
        }

        let group = Node::new("g");
        for child in target.children() {
            group.append(child.deep_copy());
        }
        group
    } else {
        target.deep_copy()
    };

    // The referenced element keeps its own transform under the use's.
    if let Ok(own) = replacement.parse_transform() {
        // Can't fail: both operands are 3×3.
        matrix = matrix.mul(&own).unwrap();
    }
    if !matrix.is_identity() {
        replacement.set_attribute("transform", &matrix.to_svg_transform(50));
    } else {
        replacement.remove_attribute("transform");
    }

    // Style from the `use` applies where the replacement has none.
    for name in use_node.attribute_names() {
        if USE_OWN_ATTRIBUTES.contains(&name.as_str()) {
            continue;
        }
        if !replacement.has_attribute(&name) {
            if let Some(value) = use_node.attribute(&name) {
                replacement.set_attribute(&name, &value);
            }
        }
    }

    use_node.insert_after(replacement);
    use_node.detach();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> RunReport {
        RunReport::default()
    }

    fn doc_with(children: Vec<Node>) -> Document {
        let root = Node::new("svg");
        for child in children {
            root.append(child);
        }
        Document::new(root)
    }

    #[test]
    fn expands_a_simple_reference() {
        let rect = Node::new("rect");
        rect.set_attribute("id", "r");
        rect.set_attribute("width", "10");
        rect.set_attribute("height", "10");

        let use_node = Node::new("use");
        use_node.set_attribute("href", "#r");
        use_node.set_attribute("x", "5");
        use_node.set_attribute("y", "7");
        use_node.set_attribute("fill", "red");

        let doc = doc_with(vec![rect, use_node]);
        let mut report = report();
        resolve_use(&doc, &Options::default(), &mut report);

        assert_eq!(report.use_resolved, 1);
        assert!(doc.elements_by_tag_name("use").is_empty());

        let rects = doc.elements_by_tag_name("rect");
        assert_eq!(rects.len(), 2);

        let copy = &rects[1];
        assert_eq!(
            copy.attribute("transform"),
            Some("matrix(1 0 0 1 5 7)".to_string())
        );
        assert_eq!(copy.attribute("fill"), Some("red".to_string()));
    }

    #[test]
    fn style_does_not_override_target() {
        let rect = Node::new("rect");
        rect.set_attribute("id", "r");
        rect.set_attribute("width", "10");
        rect.set_attribute("height", "10");
        rect.set_attribute("fill", "blue");

        let use_node = Node::new("use");
        use_node.set_attribute("href", "#r");
        use_node.set_attribute("fill", "red");

        let doc = doc_with(vec![rect, use_node]);
        resolve_use(&doc, &Options::default(), &mut report());

        let rects = doc.elements_by_tag_name("rect");
        assert_eq!(rects[1].attribute("fill"), Some("blue".to_string()));
    }

    #[test]
    fn dangling_reference_is_removed() {
        let use_node = Node::new("use");
        use_node.set_attribute("href", "#missing");

        let doc = doc_with(vec![use_node]);
        let mut report = report();
        resolve_use(&doc, &Options::default(), &mut report);

        assert!(doc.elements_by_tag_name("use").is_empty());
        assert_eq!(report.use_resolved, 0);
    }

    #[test]
    fn nested_use_chains_resolve() {
        let rect = Node::new("rect");
        rect.set_attribute("id", "r");
        rect.set_attribute("width", "1");
        rect.set_attribute("height", "1");

        let inner = Node::new("use");
        inner.set_attribute("id", "inner");
        inner.set_attribute("href", "#r");

        let outer = Node::new("use");
        outer.set_attribute("href", "#inner");

        let doc = doc_with(vec![rect, inner, outer]);
        let mut report = report();
        resolve_use(&doc, &Options::default(), &mut report);

        assert!(doc.elements_by_tag_name("use").is_empty());
        assert_eq!(doc.elements_by_tag_name("rect").len(), 3);
    }

    #[test]
    fn symbol_becomes_a_group() {
        let symbol = Node::new("symbol");
        symbol.set_attribute("id", "s");
        symbol.set_attribute("viewBox", "0 0 10 10");
        let rect = Node::new("rect");
        rect.set_attribute("width", "10");
        rect.set_attribute("height", "10");
        symbol.append(rect);

        let use_node = Node::new("use");
        use_node.set_attribute("href", "#s");
        use_node.set_attribute("width", "20");
        use_node.set_attribute("height", "20");

        let doc = doc_with(vec![symbol, use_node]);
        resolve_use(&doc, &Options::default(), &mut report());

        let groups = doc.elements_by_tag_name("g");
        assert_eq!(groups.len(), 1);
        // viewBox 10 → viewport 20 is a uniform scale of 2.
        assert_eq!(
            groups[0].attribute("transform"),
            Some("matrix(2 0 0 2 0 0)".to_string())
        );
    }
}
