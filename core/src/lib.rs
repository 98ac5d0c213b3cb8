//! # Umbra
//!
//! Inference-only execution of neural networks described as a flat list of
//! tensor declarations and an ordered list of operators.
//!
//! ## Example
//!
//! ```
//! use std::collections::HashMap;
//! use umbra_core::prelude::*;
//!
//! // y = x + 3
//! let model = r#"{
//!     "blob": [ { "name": "x", "shape": [1, 3] }, { "name": "y" } ],
//!     "op": [
//!         { "name": "input", "type": "Input", "top": ["x"],
//!           "arg": [ { "name": "x", "v_i": [1, 3] } ] },
//!         { "name": "add", "type": "Binary", "bottom": ["x"], "top": ["y"],
//!           "arg": [ { "name": "operation", "s_i": 0 }, { "name": "scalar", "s_f": 3.0 } ] }
//!     ],
//!     "arg": [ { "name": "out_blob", "v_s": ["y"] } ]
//! }"#;
//!
//! let mut engine = Native::default();
//! engine.load_text(model).unwrap();
//!
//! let mut inputs = HashMap::new();
//! inputs.insert("x".to_string(), InputData::from(&[1f32, 2., 3.][..]));
//! engine.forward(&inputs, &HashMap::new()).unwrap();
//!
//! let y = engine.output::<f32>("y").unwrap();
//! assert_eq!(y.as_slice::<f32>().unwrap(), &[4., 5., 6.]);
//! ```

#[macro_use]
extern crate derive_new;
#[macro_use]
extern crate log;
pub extern crate umbra_data;
pub extern crate downcast_rs;

pub mod broadcast;
pub mod context;
pub mod model;
pub mod native;
pub mod ops;
pub mod vision;
pub mod workspace;

pub use umbra_data::prelude::*;

pub mod prelude {
    pub use crate::context::{Device, DeviceContext};
    pub use crate::model::{Argument, BlobParam, NetParam, OpParam};
    pub use crate::native::{EngineOptions, InputData, Native, Weights};
    pub use crate::workspace::Workspace;
    pub use umbra_data::prelude::*;
}

pub mod internal {
    pub use crate::broadcast::broadcast_shapes;
    pub use crate::model::ArgumentHelper;
    pub use crate::ops::{OpBase, Operator, Registry};
    pub use crate::prelude::*;
    pub use std::cell::{Ref, RefMut};
    pub use std::collections::HashMap;
    pub use umbra_data::internal::*;
}

#[cfg(test)]
#[allow(dead_code)]
fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("UMBRA_LOG").try_init();
}
