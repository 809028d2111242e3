use crate::{Array2, CsrMatrix};

/// One row of the 5-point stencil matrix. Only the right and up couplings
/// are stored; left and down are read from the neighbouring rows.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FdmMatrixRow2 {
    pub center: f64,
    pub right: f64,
    pub up: f64,
}

impl FdmMatrixRow2 {
    pub const IDENTITY: Self = Self {
        center: 1.0,
        right: 0.0,
        up: 0.0,
    };
}

pub type FdmVector2 = Array2<f64>;
pub type FdmMatrix2 = Array2<FdmMatrixRow2>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FdmLinearSystem2 {
    pub a: FdmMatrix2,
    pub x: FdmVector2,
    pub b: FdmVector2,
}

impl FdmLinearSystem2 {
    pub fn new(width: usize, height: usize) -> Self {
        let mut system = Self::default();
        system.resize(width, height);
        system
    }

    /// Zeroes A and b. x keeps its contents when the shape is unchanged so a
    /// solve can warm-start from the previous result.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.a.resize(width, height, FdmMatrixRow2::default());
        self.a.fill(FdmMatrixRow2::default());
        self.b.resize(width, height, 0.0);
        self.b.fill(0.0);
        self.x.resize(width, height, 0.0);
    }

    pub fn clear(&mut self) {
        self.a.clear();
        self.x.clear();
        self.b.clear();
    }

    pub fn size(&self) -> (usize, usize) {
        self.a.size()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FdmCompressedLinearSystem2 {
    pub a: CsrMatrix,
    pub x: Vec<f64>,
    pub b: Vec<f64>,
}

impl FdmCompressedLinearSystem2 {
    pub fn clear(&mut self) {
        self.a.clear();
        self.x.clear();
        self.b.clear();
    }

    pub fn len(&self) -> usize {
        self.b.len()
    }

    pub fn is_empty(&self) -> bool {
        self.b.is_empty()
    }
}
