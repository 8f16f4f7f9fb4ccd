//! # kvattr Codec
//!
//! Attribute kinds and their string codecs.
//!
//! Scalar attributes are stored as plain strings in a key-value store. This
//! crate defines how each [`AttrKind`] maps a [`Value`] to and from that
//! string form:
//!
//! | kind       | stored as                      |
//! |------------|--------------------------------|
//! | string     | the text                       |
//! | integer    | decimal digits                 |
//! | boolean    | `"t"` or `"f"`                 |
//! | json       | JSON text of an array / object |
//! | sorted_set | not a scalar, never encoded    |
//!
//! All functions are pure. The only non-fatal degradation is the `json` kind,
//! where shapes other than arrays and objects become [`Value::Null`] and a
//! warning is logged.
//!
//! ## Usage
//!
//! ```
//! use kvattr_codec::{decode, encode, AttrKind, Value};
//!
//! let raw = encode(&Value::Bool(true), AttrKind::Boolean).unwrap();
//! assert_eq!(raw.as_deref(), Some("t"));
//!
//! let back = decode(raw.as_deref(), AttrKind::Boolean).unwrap();
//! assert_eq!(back, Value::Bool(true));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod kind;
mod value;

pub use decoder::{coerce, decode, parse_leading_integer};
pub use encoder::{encode, FALSE_TOKEN, TRUE_TOKEN};
pub use error::{CodecError, CodecResult};
pub use kind::AttrKind;
pub use value::Value;
