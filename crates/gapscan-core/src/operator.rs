//! Sparse many-body operators built from tensor products of Pauli matrices.
//!
//! Every full-space operator is assembled the naive way: a chain of sparse
//! Kronecker products of 2×2 factors, identity on every qubit except the
//! ones a term acts on. The problem Hamiltonian is always diagonal in the σz
//! basis and could be filled in directly; the tensor path is kept so the
//! construction cost stays the one the scaling experiments measure.
//!
//! Qubit 0 is the leftmost Kronecker factor (most significant index bit).

use std::sync::{Arc, PoisonError, RwLock};

use nalgebra::DMatrix;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ResourceLimits;
use crate::error::{GapError, GapResult};
use crate::instance::ProblemInstance;

/// Real single-qubit Pauli operator.
///
/// σy is not needed for stoquastic annealing Hamiltonians and would force
/// complex storage, so it is not represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pauli {
    /// Identity.
    I,
    /// Pauli-X.
    X,
    /// Pauli-Z.
    Z,
}

/// Square real sparse matrix in Compressed Sparse Row format.
///
/// Column indices are strictly increasing within each row and no explicit
/// zeros are stored.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseOperator {
    dim: usize,
    row_ptr: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<f64>,
}

impl SparseOperator {
    /// The `dim`×`dim` identity.
    pub fn identity(dim: usize) -> Self {
        Self::from_diagonal(&vec![1.0; dim])
    }

    /// Diagonal operator with the given entries.
    pub fn from_diagonal(diagonal: &[f64]) -> Self {
        let mut row_ptr = Vec::with_capacity(diagonal.len() + 1);
        let mut col_indices = Vec::with_capacity(diagonal.len());
        let mut values = Vec::with_capacity(diagonal.len());
        row_ptr.push(0);
        for (i, &v) in diagonal.iter().enumerate() {
            if v != 0.0 {
                col_indices.push(i);
                values.push(v);
            }
            row_ptr.push(col_indices.len());
        }
        Self {
            dim: diagonal.len(),
            row_ptr,
            col_indices,
            values,
        }
    }

    /// The 2×2 matrix of a single Pauli.
    pub fn pauli(p: Pauli) -> Self {
        match p {
            Pauli::I => Self::identity(2),
            Pauli::Z => Self::from_diagonal(&[1.0, -1.0]),
            Pauli::X => Self {
                dim: 2,
                row_ptr: vec![0, 1, 2],
                col_indices: vec![1, 0],
                values: vec![1.0, 1.0],
            },
        }
    }

    /// Matrix dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored non-zero entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Iterate over the `(column, value)` entries of `row`.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_ptr[row]..self.row_ptr[row + 1];
        self.col_indices[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// Entry at (`row`, `col`), zero if not stored.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let range = self.row_ptr[row]..self.row_ptr[row + 1];
        match self.col_indices[range.clone()].binary_search(&col) {
            Ok(offset) => self.values[range.start + offset],
            Err(_) => 0.0,
        }
    }

    /// Kronecker product `self ⊗ other`.
    pub fn kron(&self, other: &SparseOperator) -> SparseOperator {
        let dim = self.dim * other.dim;
        let mut row_ptr = Vec::with_capacity(dim + 1);
        let mut col_indices = Vec::with_capacity(self.nnz() * other.nnz());
        let mut values = Vec::with_capacity(self.nnz() * other.nnz());
        row_ptr.push(0);

        for a in 0..self.dim {
            for b in 0..other.dim {
                for (ca, va) in self.row(a) {
                    for (cb, vb) in other.row(b) {
                        col_indices.push(ca * other.dim + cb);
                        values.push(va * vb);
                    }
                }
                row_ptr.push(col_indices.len());
            }
        }

        SparseOperator {
            dim,
            row_ptr,
            col_indices,
            values,
        }
    }

    /// `a·self + b·other`, merging rows and dropping exact zeros.
    pub fn linear_combination(&self, a: f64, other: &SparseOperator, b: f64) -> GapResult<Self> {
        if self.dim != other.dim {
            return Err(GapError::config(format!(
                "cannot combine operators of dimension {} and {}",
                self.dim, other.dim
            )));
        }

        let mut row_ptr = Vec::with_capacity(self.dim + 1);
        let mut col_indices = Vec::with_capacity(self.nnz().max(other.nnz()));
        let mut values = Vec::with_capacity(self.nnz().max(other.nnz()));
        row_ptr.push(0);

        for r in 0..self.dim {
            let mut lhs = self.row(r).peekable();
            let mut rhs = other.row(r).peekable();
            loop {
                let (col, v) = match (lhs.peek().copied(), rhs.peek().copied()) {
                    (Some((cl, vl)), Some((cr, vr))) if cl == cr => {
                        lhs.next();
                        rhs.next();
                        (cl, a * vl + b * vr)
                    }
                    (Some((cl, vl)), Some((cr, _))) if cl < cr => {
                        lhs.next();
                        (cl, a * vl)
                    }
                    (_, Some((cr, vr))) => {
                        rhs.next();
                        (cr, b * vr)
                    }
                    (Some((cl, vl)), None) => {
                        lhs.next();
                        (cl, a * vl)
                    }
                    (None, None) => break,
                };
                if v != 0.0 {
                    col_indices.push(col);
                    values.push(v);
                }
            }
            row_ptr.push(col_indices.len());
        }

        Ok(SparseOperator {
            dim: self.dim,
            row_ptr,
            col_indices,
            values,
        })
    }

    /// y = A·x.
    pub fn matvec(&self, x: &[f64]) -> Vec<f64> {
        (0..self.dim)
            .map(|r| self.row(r).map(|(c, v)| v * x[c]).sum::<f64>())
            .collect()
    }

    /// Main diagonal.
    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.dim).map(|i| self.get(i, i)).collect()
    }

    /// True if no off-diagonal entry is stored.
    pub fn is_diagonal(&self) -> bool {
        (0..self.dim).all(|r| self.row(r).all(|(c, _)| c == r))
    }

    /// Real symmetric (hence Hermitian) within `tol`.
    pub fn is_hermitian(&self, tol: f64) -> bool {
        // An entry missing from the mirrored slot reads back as zero.
        (0..self.dim).all(|r| self.row(r).all(|(c, v)| (self.get(c, r) - v).abs() <= tol))
    }

    /// Upper bound on the spectral norm: the largest absolute row sum.
    pub fn norm_bound(&self) -> f64 {
        (0..self.dim)
            .map(|r| self.row(r).map(|(_, v)| v.abs()).sum::<f64>())
            .fold(0.0, f64::max)
    }

    /// Dense copy.
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut m = DMatrix::zeros(self.dim, self.dim);
        for r in 0..self.dim {
            for (c, v) in self.row(r) {
                m[(r, c)] = v;
            }
        }
        m
    }
}

/// Builds full-space Pauli operators and the two annealing Hamiltonians for
/// a fixed qubit count.
#[derive(Debug, Clone, Copy)]
pub struct OperatorBuilder {
    num_qubits: usize,
}

impl OperatorBuilder {
    /// Builder for `num_qubits` qubits, rejected if beyond the sparse ceiling.
    pub fn new(num_qubits: usize, limits: &ResourceLimits) -> GapResult<Self> {
        if num_qubits < 1 {
            return Err(GapError::config("N must be at least 1"));
        }
        limits.check_sparse(num_qubits)?;
        Ok(Self { num_qubits })
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Full-space operator of a Pauli string given as `(qubit, pauli)` pairs.
    ///
    /// Unlisted qubits carry the identity. A qubit listed twice is an error.
    pub fn pauli_string(&self, ops: &[(usize, Pauli)]) -> GapResult<SparseOperator> {
        let mut slots = vec![Pauli::I; self.num_qubits];
        for &(q, p) in ops {
            if q >= self.num_qubits {
                return Err(GapError::config(format!(
                    "Pauli string references qubit {q} but only {} qubits exist",
                    self.num_qubits
                )));
            }
            if slots[q] != Pauli::I {
                return Err(GapError::config(format!("qubit {q} listed twice")));
            }
            slots[q] = p;
        }

        Ok(slots
            .iter()
            .fold(SparseOperator::identity(1), |acc, &p| {
                acc.kron(&SparseOperator::pauli(p))
            }))
    }

    /// σx on qubit `i`.
    pub fn sigma_x(&self, i: usize) -> GapResult<SparseOperator> {
        self.pauli_string(&[(i, Pauli::X)])
    }

    /// σz on qubit `i`.
    pub fn sigma_z(&self, i: usize) -> GapResult<SparseOperator> {
        self.pauli_string(&[(i, Pauli::Z)])
    }

    /// Transverse-field driver H_driver = −Σ_i σx_i.
    pub fn driver(&self) -> GapResult<SparseOperator> {
        let dim = 1usize << self.num_qubits;
        let mut acc = SparseOperator::from_diagonal(&vec![0.0; dim]);
        for i in 0..self.num_qubits {
            acc = acc.linear_combination(1.0, &self.sigma_x(i)?, -1.0)?;
        }
        debug!(n = self.num_qubits, nnz = acc.nnz(), "built driver Hamiltonian");
        Ok(acc)
    }

    /// Problem Hamiltonian Σ_{i<j} J_ij σz_i σz_j + Σ_i h_i σz_i.
    pub fn problem(&self, instance: &ProblemInstance) -> GapResult<SparseOperator> {
        let n = self.num_qubits;
        if instance.num_qubits() != n {
            return Err(GapError::config(format!(
                "instance has {} qubits, builder has {n}",
                instance.num_qubits()
            )));
        }

        let j = instance.couplings();
        let h = instance.fields();
        let mut acc = SparseOperator::from_diagonal(&vec![0.0; 1usize << n]);
        for a in 0..n {
            for b in (a + 1)..n {
                if j[(a, b)] != 0.0 {
                    let zz = self.pauli_string(&[(a, Pauli::Z), (b, Pauli::Z)])?;
                    acc = acc.linear_combination(1.0, &zz, j[(a, b)])?;
                }
            }
            if h[a] != 0.0 {
                acc = acc.linear_combination(1.0, &self.sigma_z(a)?, h[a])?;
            }
        }
        debug!(n, nnz = acc.nnz(), "built problem Hamiltonian");
        Ok(acc)
    }
}

/// Shared driver Hamiltonians keyed by qubit count.
///
/// Off by default: rebuilding the driver per instance is part of the cost
/// being measured. Pass one to [`crate::AnnealingHamiltonian::with_cache`]
/// to amortise it across a sweep.
#[derive(Debug, Default)]
pub struct DriverCache {
    drivers: RwLock<FxHashMap<usize, Arc<SparseOperator>>>,
}

impl DriverCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached driver for the builder's N, building it on first use.
    pub fn get_or_build(&self, builder: &OperatorBuilder) -> GapResult<Arc<SparseOperator>> {
        let n = builder.num_qubits();
        if let Some(hit) = self
            .drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&n)
        {
            return Ok(Arc::clone(hit));
        }

        let built = Arc::new(builder.driver()?);
        let mut drivers = self.drivers.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(drivers.entry(n).or_insert(built)))
    }

    /// Number of cached drivers.
    pub fn len(&self) -> usize {
        self.drivers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
