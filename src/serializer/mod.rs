//! Field/serializer model shared by every FTMS characteristic codec.

mod model;
mod num;
mod value;

pub use model::{
    decode_bitmask_frame, decode_code_switched, strip_arity_suffix, supported_fields,
    BitmaskFrame, CodeSwitchRecord, Field, FieldKind,
};
pub use num::NumSerializer;
pub use value::{FieldMap, Value};
