//! Dense symmetric eigendecomposition.

use nalgebra::DVector;

use crate::operator::SparseOperator;

/// Peak bytes of one decomposition: the dense matrix and its eigenvector matrix.
pub(super) fn workspace_bytes(dim: usize) -> u64 {
    (dim as u64)
        .saturating_mul(dim as u64)
        .saturating_mul(2 * size_of::<f64>() as u64)
}

/// Lowest `k` eigenpairs of `op` via a full `SymmetricEigen` of its dense copy.
///
/// `k` is clamped to the dimension.
pub(super) fn lowest_eigenpairs(op: &SparseOperator, k: usize) -> (Vec<f64>, Vec<DVector<f64>>) {
    let eig = op.to_dense().symmetric_eigen();

    let mut order: Vec<usize> = (0..eig.eigenvalues.len()).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));
    order.truncate(k.min(op.dim()));

    let energies = order.iter().map(|&i| eig.eigenvalues[i]).collect();
    let states = order
        .iter()
        .map(|&i| eig.eigenvectors.column(i).into_owned())
        .collect();
    (energies, states)
}
