// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All tensor code lives here. The domain layer describes the
// supergraph on the host; this layer turns it into tensors,
// encodes it with GripNet and scores drug pairs with DistMult.
//
//   inputs.rs          host graph → index/norm tensors
//   layers.rs          GCN and basis-decomposed RGCN layers
//   gripnet.rs         internal + external modules, the encoder
//   decoder.rs         multi-relational DistMult decoder
//   link_prediction.rs encoder + decoder, loss
//   trainer.rs         full-graph Adam loop with evaluation
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Xu et al. (2022) GripNet
//            Schlichtkrull et al. (2018) R-GCN

/// NdArray or Wgpu, plus the Autodiff wrapper
pub mod backend;

/// Tensors derived from the supergraph
pub mod inputs;

/// Graph convolution layers
pub mod layers;

/// The GripNet encoder
pub mod gripnet;

/// DistMult decoder
pub mod decoder;

/// Encoder + decoder for link prediction
pub mod link_prediction;

/// Multi-step learning-rate schedule with warm-up
pub mod scheduler;

/// AUROC / AUPRC / AP@50
pub mod evaluation;

/// Full training loop with evaluation and checkpointing
pub mod trainer;
