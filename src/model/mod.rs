// Model module - neural segmentation forward path
//
// Module organization:
// - task: task specifications (classes, powerset encoding)
// - mfcc: waveform -> MFCC front-end
// - lstm: bidirectional LSTM encoder
// - linear: classifier layer and output activations
// - segmentation: SimpleSegmentation, wiring the pieces together

pub mod linear;
pub mod lstm;
pub mod mfcc;
pub mod segmentation;
pub mod task;

pub use linear::{Activation, Linear};
pub use lstm::{BiLstm, LstmWeights};
pub use mfcc::MfccTransform;
pub use segmentation::{output_dimension, SimpleSegmentation, Tensor, LSTM_HIDDEN_SIZE};
pub use task::{Problem, Specifications, TaskSpecification};
