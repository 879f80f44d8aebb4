// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// a specific goal (summarising, training or evaluating the model).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern

/// Run configuration: defaults, JSON file, CLI overrides
pub mod config;

/// Gene → drug supergraph and its channel settings
pub mod pose_graph;

/// Build the model once and report its structure
pub mod summary_use_case;

/// The training workflow
pub mod train_use_case;

/// Score the test split with a saved run
pub mod evaluate_use_case;
