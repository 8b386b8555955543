//! Morse-code audio synthesis engine: tone queue, PCM generator, straight
//! key and iambic keyer, wired together behind a single control plane.

pub mod alphabet;
pub mod control;
pub mod error;
pub mod generator;
pub mod keyer;
pub mod queue;
pub mod sink;
pub mod timing;
pub mod tone;

pub use control::ControlPlane;
pub use error::{CwError, CwResult};
pub use generator::{Generator, GeneratorHandle, KeyerHook, KeyingCallback, ToneShape};
pub use keyer::{IambicKeyer, StraightKey};
pub use queue::{Dequeued, QueueState, ToneQueue};
pub use sink::{AudioSink, ConsoleSink, NullSink, RodioSink, WavSink};
pub use timing::Timing;
pub use tone::{SlopeMode, Tone};
