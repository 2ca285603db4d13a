//! Model providers for feature-importance analysis
//!
//! A weighted CART classification tree and a bagged random forest. The
//! forest is the impurity ensemble MDI consumes; anything implementing
//! [`Classifier`] works with MDA.

mod models;
pub mod decision_tree;
pub mod random_forest;

pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use models::Classifier;
pub use random_forest::{MaxFeatures, RandomForest};
