// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The mutable element tree the pipeline owns and rewrites.
//!
//! This is the crate's side of the DOM contract: a parser collaborator
//! builds this tree from SVG text and serializes it back; the pipeline
//! only ever sees [`Node`]s. Tag names are case-folded to lowercase;
//! `href` and `xlink:href` are treated as synonyms.

use std::collections::{HashMap, HashSet};

use crate::decimal::Decimal;
use crate::matrix::Matrix;
use crate::path::Shape;
use crate::Error;

/// A coordinate-system mode for clip paths, masks and patterns.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Units {
    /// Coordinates are in the current user space.
    UserSpaceOnUse,
    /// Coordinates are fractions of the target's bounding box.
    ObjectBoundingBox,
}

impl Default for Units {
    #[inline]
    fn default() -> Self {
        Units::UserSpaceOnUse
    }
}

impl Units {
    /// Parses an SVG units keyword.
    pub fn from_str(text: &str) -> Option<Self> {
        match text {
            "userSpaceOnUse" => Some(Units::UserSpaceOnUse),
            "objectBoundingBox" => Some(Units::ObjectBoundingBox),
            _ => None,
        }
    }
}

/// Extracts the id from a `url(#id)` functional reference.
pub fn parse_func_iri(value: &str) -> Option<String> {
    let value = value.trim();
    let inner = value.strip_prefix("url(")?.strip_suffix(')')?;
    let id = inner.trim().strip_prefix('#')?;
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

struct ElementData {
    tag_name: String,
    attributes: Vec<(String, String)>,
}

/// An element node of the document tree.
///
/// Cloning a `Node` clones the reference, not the element.
#[derive(Clone)]
pub struct Node(rctree::Node<ElementData>);

impl Node {
    /// Creates a detached element. The tag name is case-folded.
    pub fn new(tag_name: &str) -> Self {
        Node(rctree::Node::new(ElementData {
            tag_name: tag_name.to_ascii_lowercase(),
            attributes: Vec::new(),
        }))
    }

    /// Returns the case-folded tag name.
    pub fn tag_name(&self) -> String {
        self.0.borrow().tag_name.clone()
    }

    /// Returns `true` when the tag name matches (case-insensitively).
    pub fn has_tag_name(&self, name: &str) -> bool {
        self.0.borrow().tag_name == name.to_ascii_lowercase()
    }

    /// Returns an attribute value.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0
            .borrow()
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    /// Sets an attribute, replacing an existing value.
    pub fn set_attribute(&self, name: &str, value: &str) {
        let mut handle = self.0.clone();
        let mut data = handle.borrow_mut();
        match data.attributes.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => data.attributes.push((name.to_string(), value.to_string())),
        }
    }

    /// Removes an attribute if present.
    pub fn remove_attribute(&self, name: &str) {
        let mut handle = self.0.clone();
        handle.borrow_mut().attributes.retain(|(n, _)| n != name);
    }

    /// Returns `true` when the attribute is present.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.0.borrow().attributes.iter().any(|(n, _)| n == name)
    }

    /// Returns the attribute names, in document order.
    pub fn attribute_names(&self) -> Vec<String> {
        self.0
            .borrow()
            .attributes
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Returns the element id.
    pub fn id(&self) -> Option<String> {
        self.attribute("id")
    }

    /// Returns the `href`/`xlink:href` target id, without the leading `#`.
    pub fn href_id(&self) -> Option<String> {
        let value = self
            .attribute("href")
            .or_else(|| self.attribute("xlink:href"))?;
        value.strip_prefix('#').map(|s| s.to_string())
    }

    /// Appends a child.
    pub fn append(&self, child: Node) {
        let mut handle = self.0.clone();
        handle.append(child.0);
    }

    /// Inserts `sibling` right after this node.
    pub fn insert_after(&self, sibling: Node) {
        let mut handle = self.0.clone();
        handle.insert_after(sibling.0);
    }

    /// Inserts `sibling` right before this node.
    pub fn insert_before(&self, sibling: Node) {
        let mut handle = self.0.clone();
        handle.insert_before(sibling.0);
    }

    /// Detaches the node from its parent.
    pub fn detach(&self) {
        let mut handle = self.0.clone();
        handle.detach();
    }

    /// Returns the parent element.
    pub fn parent(&self) -> Option<Node> {
        self.0.parent().map(Node)
    }

    /// Returns a snapshot of the children.
    pub fn children(&self) -> Vec<Node> {
        self.0.children().map(Node).collect()
    }

    /// Returns `true` when the node has children.
    pub fn has_children(&self) -> bool {
        self.0.first_child().is_some()
    }

    /// Returns a snapshot of the node and all its descendants,
    /// in document order.
    pub fn descendants(&self) -> Vec<Node> {
        self.0.descendants().map(Node).collect()
    }

    /// Returns a deep copy of the subtree.
    pub fn deep_copy(&self) -> Node {
        let copy = Node::new(&self.tag_name());
        {
            let mut handle = copy.0.clone();
            let mut data = handle.borrow_mut();
            data.attributes = self.0.borrow().attributes.clone();
        }
        for child in self.children() {
            copy.append(child.deep_copy());
        }

        copy
    }

    /// Returns `true` when both handles refer to the same element.
    pub fn same_node(&self, other: &Node) -> bool {
        let a = self.0.borrow();
        let b = other.0.borrow();
        std::ptr::eq(&*a, &*b)
    }

    /// Parses an attribute as a decimal number.
    ///
    /// Returns `default` when the attribute is missing or malformed.
    pub fn decimal_attribute(&self, name: &str, default: Decimal) -> Decimal {
        match self.attribute(name) {
            Some(value) => match Decimal::parse(&value) {
                Ok(v) => v,
                Err(_) => {
                    log::warn!(
                        "element '{}' has an invalid '{}' value. Using the default.",
                        self.id().unwrap_or_else(|| self.tag_name()),
                        name
                    );
                    default
                }
            },
            None => default,
        }
    }

    /// Parses the `transform` attribute.
    ///
    /// A missing attribute is the identity; a malformed one is an error.
    pub fn parse_transform(&self) -> Result<Matrix, Error> {
        match self.attribute("transform") {
            Some(value) => Matrix::parse(&value),
            None => Ok(Matrix::identity(3)),
        }
    }

    /// Builds a [`Shape`] descriptor from a basic-shape or path element.
    ///
    /// Returns `None` for non-shape elements or invalid geometry.
    pub fn shape(&self) -> Option<Shape> {
        let zero = Decimal::zero;
        match self.tag_name().as_str() {
            "rect" => Some(Shape::Rect {
                x: self.decimal_attribute("x", zero()),
                y: self.decimal_attribute("y", zero()),
                width: self.decimal_attribute("width", zero()),
                height: self.decimal_attribute("height", zero()),
                rx: self
                    .attribute("rx")
                    .and_then(|v| Decimal::parse(&v).ok()),
                ry: self
                    .attribute("ry")
                    .and_then(|v| Decimal::parse(&v).ok()),
            }),
            "circle" => Some(Shape::Circle {
                cx: self.decimal_attribute("cx", zero()),
                cy: self.decimal_attribute("cy", zero()),
                r: self.decimal_attribute("r", zero()),
            }),
            "ellipse" => Some(Shape::Ellipse {
                cx: self.decimal_attribute("cx", zero()),
                cy: self.decimal_attribute("cy", zero()),
                rx: self.decimal_attribute("rx", zero()),
                ry: self.decimal_attribute("ry", zero()),
            }),
            "line" => Some(Shape::Line {
                x1: self.decimal_attribute("x1", zero()),
                y1: self.decimal_attribute("y1", zero()),
                x2: self.decimal_attribute("x2", zero()),
                y2: self.decimal_attribute("y2", zero()),
            }),
            "polygon" | "polyline" => {
                let text = self.attribute("points")?;
                let points = match crate::path::parse_points(&text) {
                    Ok(points) => points,
                    Err(_) => {
                        log::warn!(
                            "element '{}' has an invalid 'points' value. Skipped.",
                            self.id().unwrap_or_else(|| self.tag_name())
                        );
                        return None;
                    }
                };

                if self.has_tag_name("polygon") {
                    Some(Shape::Polygon { points })
                } else {
                    Some(Shape::Polyline { points })
                }
            }
            "path" => Some(Shape::Path { d: self.attribute("d")? }),
            _ => None,
        }
    }

    /// Returns `true` for elements that carry renderable geometry.
    pub fn is_shape_element(&self) -> bool {
        matches!(
            self.tag_name().as_str(),
            "rect" | "circle" | "ellipse" | "line" | "polygon" | "polyline" | "path"
        )
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Node(<{}", self.tag_name())?;
        for (name, value) in &self.0.borrow().attributes {
            write!(f, " {}='{}'", name, value)?;
        }
        write!(f, ">, {} children)", self.children().len())
    }
}

/// The document: a root element plus derived, rebuildable indices.
#[derive(Debug)]
pub struct Document {
    root: Node,
}

impl Document {
    /// Creates a document around an existing root element.
    pub fn new(root: Node) -> Self {
        Document { root }
    }

    /// Returns the root element.
    pub fn root(&self) -> Node {
        self.root.clone()
    }

    /// Rebuilds the `id → element` index.
    ///
    /// The index is derived data; every pipeline stage that mutates
    /// the tree rebuilds it before the next stage runs.
    pub fn ids(&self) -> HashMap<String, Node> {
        let mut map = HashMap::new();
        for node in self.root.descendants() {
            if let Some(id) = node.id() {
                // The first occurrence wins, like getElementById.
                map.entry(id).or_insert(node);
            }
        }

        map
    }

    /// Returns a snapshot of all elements with the given tag name.
    pub fn elements_by_tag_name(&self, tag_name: &str) -> Vec<Node> {
        let tag_name = tag_name.to_ascii_lowercase();
        self.root
            .descendants()
            .into_iter()
            .filter(|n| n.tag_name() == tag_name)
            .collect()
    }

    /// Collects every id referenced via `url(#id)` in any attribute
    /// or via `href`/`xlink:href`.
    pub fn referenced_ids(&self) -> HashSet<String> {
        let mut ids = HashSet::new();
        for node in self.root.descendants() {
            for name in node.attribute_names() {
                let value = match node.attribute(&name) {
                    Some(v) => v,
                    None => continue,
                };

                if name == "href" || name == "xlink:href" {
                    if let Some(id) = value.strip_prefix('#') {
                        ids.insert(id.to_string());
                    }
                    continue;
                }

                let mut rest = value.as_str();
                while let Some(start) = rest.find("url(#") {
                    let tail = &rest[start + 5..];
                    match tail.find(')') {
                        Some(end) => {
                            ids.insert(tail[..end].trim().to_string());
                            rest = &tail[end..];
                        }
                        None => break,
                    }
                }
            }
        }

        ids
    }
}
