//! Touch-panel input: device discovery, source abstraction, event
//! normalization and gesture classification.

pub mod config;
pub mod device;
pub mod diagnostics;
pub mod error;
pub mod gesture;
pub mod handler;
pub mod host;
pub mod normalize;
pub mod source;
pub mod trace;
pub mod types;

pub use config::{InputConfig, SourceKind, SyntheticConfig, SyntheticPattern};
pub use error::{InputError, Result};
pub use gesture::{GestureClassifier, GestureEvent, GestureKind};
pub use handler::{sink::EventSink, InputHandler};
pub use source::{InputSource, Source, SourceCapabilities, SourceStatus};
pub use types::{InputEvent, KeyEvent, MouseEvent, PointerEvent, PointerKind, SourceLabel};
