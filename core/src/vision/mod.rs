//! Native numeric kernels.
//!
//! Free functions over plain slices. Shapes are passed explicitly and have
//! been validated by the calling operator; kernels only `debug_assert!` them.

mod activate;
mod binary;
mod conv;
mod layout;
mod normalize;
mod pooling;
mod reduce;
mod roi;
mod transform;

pub use activate::{activate, prelu, Activation};
pub use binary::{binary, binary_scalar, broadcast_binary, BinaryOperation};
pub use conv::{conv_out_size, depthwise, im2col, ConvGeometry};
pub use layout::{concat, permute, reorg};
pub use normalize::{normalize, NORMALIZE_EPS};
pub use pooling::{pool_out_size, pooling, PoolGeometry, PoolMode};
pub use reduce::{ReduceOperation, ReducePlan};
pub use roi::{proposal, roi_pooling, ProposalConfig};
pub use transform::{bias, data_transform, lrn, scale, LrnParams};
