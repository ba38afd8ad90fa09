//! Forward-mode automatic differentiation with sparse derivative storage.
//!
//! The main purpose of this crate is to support the `mortar` constraint assembly library.
//! However, it has no dependence on meshes or assembly and may be used completely
//! independently of `mortar`.
//!
//! The central type is [`Dual`], a scalar value bundled with a sparse vector of partial
//! derivatives with respect to global unknowns. Arithmetic on duals propagates derivatives
//! by the usual chain/product/quotient rules, so that a quantity computed from solver
//! unknowns carries its exact Jacobian row alongside its value.

use fenris_traits::Real;

/// A sparse vector of partial derivatives, indexed by global unknown.
///
/// Entries are stored sorted by index, which makes merging two operand vectors a
/// linear-time operation.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseDerivatives<T> {
    entries: Vec<(usize, T)>,
}

impl<T> Default for SparseDerivatives<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T: Real> SparseDerivatives<T> {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The derivative vector of a variable that depends directly and linearly on the
    /// unknown with the given index.
    pub fn unit(index: usize) -> Self {
        Self {
            entries: vec![(index, T::one())],
        }
    }

    /// Builds a derivative vector from arbitrary (index, partial) pairs.
    ///
    /// The pairs need not be sorted; duplicate indices are summed.
    pub fn from_entries(mut entries: Vec<(usize, T)>) -> Self {
        entries.sort_unstable_by_key(|(index, _)| *index);
        let mut merged: Vec<(usize, T)> = Vec::with_capacity(entries.len());
        for (index, partial) in entries {
            match merged.last_mut() {
                Some((last_index, last_partial)) if *last_index == index => {
                    *last_partial += partial;
                }
                _ => merged.push((index, partial)),
            }
        }
        Self { entries: merged }
    }

    /// The partial derivative with respect to the given unknown (zero if absent).
    pub fn get(&self, index: usize) -> T {
        self.entries
            .binary_search_by_key(&index, |(i, _)| *i)
            .map(|pos| self.entries[pos].1)
            .unwrap_or_else(|_| T::zero())
    }

    /// Sets the partial derivative with respect to the given unknown, overwriting any
    /// existing entry.
    pub fn insert(&mut self, index: usize, partial: T) {
        match self.entries.binary_search_by_key(&index, |(i, _)| *i) {
            Ok(pos) => self.entries[pos].1 = partial,
            Err(pos) => self.entries.insert(pos, (index, partial)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, T)> + '_ {
        self.entries.iter().copied()
    }

    pub fn scaled(&self, alpha: T) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|&(index, partial)| (index, alpha * partial))
                .collect(),
        }
    }

    /// Computes `alpha * a + beta * b` by merging the two sorted entry vectors.
    pub fn linear_combination(alpha: T, a: &Self, beta: T, b: &Self) -> Self {
        let mut entries = Vec::with_capacity(a.entries.len() + b.entries.len());
        let mut a_iter = a.entries.iter().peekable();
        let mut b_iter = b.entries.iter().peekable();

        loop {
            match (a_iter.peek(), b_iter.peek()) {
                (Some(&&(i, da)), Some(&&(j, db))) => {
                    if i < j {
                        entries.push((i, alpha * da));
                        a_iter.next();
                    } else if j < i {
                        entries.push((j, beta * db));
                        b_iter.next();
                    } else {
                        entries.push((i, alpha * da + beta * db));
                        a_iter.next();
                        b_iter.next();
                    }
                }
                (Some(&&(i, da)), None) => {
                    entries.push((i, alpha * da));
                    a_iter.next();
                }
                (None, Some(&&(j, db))) => {
                    entries.push((j, beta * db));
                    b_iter.next();
                }
                (None, None) => break,
            }
        }

        Self { entries }
    }
}

/// A scalar carrying exact partial derivatives with respect to global unknowns.
///
/// `Dual` implements the usual arithmetic operations together with the non-smooth
/// kernels `min`, `max` and `abs`, which select a branch by comparing *values* at the
/// current point. The selected operand is returned unchanged, value and derivatives
/// alike, so sub-gradient selection at a kink requires no special-casing by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Dual<T> {
    value: T,
    derivatives: SparseDerivatives<T>,
}

impl<T: Real> Default for Dual<T> {
    fn default() -> Self {
        Self::constant(T::zero())
    }
}

impl<T: Real> Dual<T> {
    /// A scalar with no dependence on any unknown.
    pub fn constant(value: T) -> Self {
        Self {
            value,
            derivatives: SparseDerivatives::empty(),
        }
    }

    /// A scalar that *is* the unknown with the given index: its derivative vector is the
    /// corresponding unit vector.
    pub fn variable(value: T, index: usize) -> Self {
        Self {
            value,
            derivatives: SparseDerivatives::unit(index),
        }
    }

    pub fn from_parts(value: T, derivatives: SparseDerivatives<T>) -> Self {
        Self { value, derivatives }
    }

    pub fn value(&self) -> T {
        self.value
    }

    pub fn derivatives(&self) -> &SparseDerivatives<T> {
        &self.derivatives
    }

    /// Declares that this scalar depends directly and linearly on the unknown with the
    /// given index, overwriting any previously accumulated partial for that unknown.
    pub fn insert_derivative(&mut self, index: usize, partial: T) {
        self.derivatives.insert(index, partial);
    }

    /// Returns the smaller (by value) of the two operands. Ties select `self`, so that
    /// repeated evaluation at the same point always follows the same branch.
    pub fn min(&self, other: &Dual<T>) -> Dual<T> {
        if other.value < self.value {
            other.clone()
        } else {
            self.clone()
        }
    }

    /// Returns the larger (by value) of the two operands. Ties select `self`.
    pub fn max(&self, other: &Dual<T>) -> Dual<T> {
        if other.value > self.value {
            other.clone()
        } else {
            self.clone()
        }
    }

    /// Absolute value. At exactly zero the positive branch is selected.
    pub fn abs(&self) -> Dual<T> {
        if self.value < T::zero() {
            -self.clone()
        } else {
            self.clone()
        }
    }

    /// Square root. The derivative is undefined at zero; no attempt is made to
    /// regularize it here.
    pub fn sqrt(&self) -> Dual<T> {
        let root = self.value.sqrt();
        let two = T::one() + T::one();
        Dual {
            value: root,
            derivatives: self.derivatives.scaled(T::one() / (two * root)),
        }
    }

    pub fn sin(&self) -> Dual<T> {
        Dual {
            value: self.value.sin(),
            derivatives: self.derivatives.scaled(self.value.cos()),
        }
    }

    pub fn cos(&self) -> Dual<T> {
        Dual {
            value: self.value.cos(),
            derivatives: self.derivatives.scaled(-self.value.sin()),
        }
    }
}

impl<T: Real> std::ops::Add for Dual<T> {
    type Output = Dual<T>;

    fn add(self, rhs: Dual<T>) -> Dual<T> {
        Dual {
            value: self.value + rhs.value,
            derivatives: SparseDerivatives::linear_combination(
                T::one(),
                &self.derivatives,
                T::one(),
                &rhs.derivatives,
            ),
        }
    }
}

impl<T: Real> std::ops::Sub for Dual<T> {
    type Output = Dual<T>;

    fn sub(self, rhs: Dual<T>) -> Dual<T> {
        Dual {
            value: self.value - rhs.value,
            derivatives: SparseDerivatives::linear_combination(
                T::one(),
                &self.derivatives,
                -T::one(),
                &rhs.derivatives,
            ),
        }
    }
}

impl<T: Real> std::ops::Mul for Dual<T> {
    type Output = Dual<T>;

    fn mul(self, rhs: Dual<T>) -> Dual<T> {
        // Product rule: (ab)' = a'b + ab'
        Dual {
            value: self.value * rhs.value,
            derivatives: SparseDerivatives::linear_combination(
                rhs.value,
                &self.derivatives,
                self.value,
                &rhs.derivatives,
            ),
        }
    }
}

impl<T: Real> std::ops::Div for Dual<T> {
    type Output = Dual<T>;

    fn div(self, rhs: Dual<T>) -> Dual<T> {
        // Quotient rule: (a/b)' = a'/b - a b' / b^2
        Dual {
            value: self.value / rhs.value,
            derivatives: SparseDerivatives::linear_combination(
                T::one() / rhs.value,
                &self.derivatives,
                -self.value / (rhs.value * rhs.value),
                &rhs.derivatives,
            ),
        }
    }
}

impl<T: Real> std::ops::Add<T> for Dual<T> {
    type Output = Dual<T>;

    fn add(self, rhs: T) -> Dual<T> {
        Dual {
            value: self.value + rhs,
            derivatives: self.derivatives,
        }
    }
}

impl<T: Real> std::ops::Sub<T> for Dual<T> {
    type Output = Dual<T>;

    fn sub(self, rhs: T) -> Dual<T> {
        Dual {
            value: self.value - rhs,
            derivatives: self.derivatives,
        }
    }
}

impl<T: Real> std::ops::Mul<T> for Dual<T> {
    type Output = Dual<T>;

    fn mul(self, rhs: T) -> Dual<T> {
        Dual {
            value: self.value * rhs,
            derivatives: self.derivatives.scaled(rhs),
        }
    }
}

impl<T: Real> std::ops::Div<T> for Dual<T> {
    type Output = Dual<T>;

    fn div(self, rhs: T) -> Dual<T> {
        Dual {
            value: self.value / rhs,
            derivatives: self.derivatives.scaled(T::one() / rhs),
        }
    }
}

impl<T: Real> std::ops::Neg for Dual<T> {
    type Output = Dual<T>;

    fn neg(self) -> Dual<T> {
        Dual {
            value: -self.value,
            derivatives: self.derivatives.scaled(-T::one()),
        }
    }
}

impl<T: Real> std::ops::AddAssign for Dual<T> {
    fn add_assign(&mut self, rhs: Dual<T>) {
        self.value += rhs.value;
        self.derivatives = SparseDerivatives::linear_combination(
            T::one(),
            &self.derivatives,
            T::one(),
            &rhs.derivatives,
        );
    }
}

impl<T: Real> std::ops::SubAssign for Dual<T> {
    fn sub_assign(&mut self, rhs: Dual<T>) {
        self.value -= rhs.value;
        self.derivatives = SparseDerivatives::linear_combination(
            T::one(),
            &self.derivatives,
            -T::one(),
            &rhs.derivatives,
        );
    }
}
