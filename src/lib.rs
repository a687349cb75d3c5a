// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
`svgflat` is an SVG flattening and geometric optimization library.

It takes a parsed SVG element tree and resolves every transform-dependent
construct into explicit, self-contained path geometry:

- `use` and `symbol` instances are expanded in place
- markers are instantiated as regular geometry
- patterns are tiled into explicit shapes
- masks are reduced to clip geometry at an opacity threshold
- `clipPath` is applied as a boolean polygon intersection
- `transform` attributes are baked into path coordinates
- `gradientTransform` is baked into gradient geometry
- unreferenced `defs` children are removed

All geometric computation runs on arbitrary-precision decimals, and
every non-trivial transformation is paired with a numerical check
recorded in a verification ledger, so precision loss is an observable
event rather than silent corruption.

The library does not own SVG text: a parser collaborator builds the
[`Document`] tree and serializes the flattened result. Rendering,
scripting, animation and networked `href` resolution are out of scope.

## Example

```
use svgflat::{flatten, Document, Node, Options};

let root = Node::new("svg");
let rect = Node::new("rect");
rect.set_attribute("width", "10");
rect.set_attribute("height", "10");
rect.set_attribute("transform", "translate(5 5)");
root.append(rect);

let mut doc = Document::new(root);
let report = flatten(&mut doc, &Options::default());

assert!(report.all_passed());
let path = &doc.root().children()[0];
assert_eq!(path.attribute("d").unwrap(), "M5 5 L15 5 L15 15 L5 15 Z");
```
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::collapsible_else_if)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::question_mark)]
#![allow(clippy::upper_case_acronyms)]

pub mod bezier;
mod clippath;
pub mod decimal;
mod error;
pub mod geom;
pub mod gjk;
mod marker;
mod mask;
pub mod matrix;
mod options;
pub mod optimizer;
mod paint_server;
pub mod path;
mod pipeline;
pub mod polygon;
mod tree;
mod use_node;
pub mod utils;
pub mod verify;

pub use crate::clippath::{
    clip_polygon_with_rule, outside_fragments, resolve_clip_node, ClipPath, ResolvedClip,
};
pub use crate::decimal::{precision, set_precision, Decimal};
pub use crate::error::Error;
pub use crate::geom::{ApproxEq, Point, Rect, Vector};
pub use crate::mask::Mask;
pub use crate::matrix::{Matrix, ReflectionAxis};
pub use crate::options::Options;
pub use crate::pipeline::{flatten, RunReport};
pub use crate::polygon::{FillRule, Polygon, RingSet};
pub use crate::tree::{parse_func_iri, Document, Node, Units};
pub use crate::verify::{Check, CheckKind, Ledger, VerificationRecord};
