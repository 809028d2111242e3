use crate::{CellFlags, CellType, Field2, Grid2, MacVelocity2, Vec2, VecField2};

/// Scalar function of position. Signed distance fields use negative = inside.
pub trait ScalarField2: Sync {
    fn sample(&self, pos: Vec2) -> f64;
}

pub trait VectorField2: Sync {
    fn sample(&self, pos: Vec2) -> Vec2;
}

impl<F> ScalarField2 for F
where
    F: Fn(Vec2) -> f64 + Sync,
{
    fn sample(&self, pos: Vec2) -> f64 {
        self(pos)
    }
}

impl<F> VectorField2 for F
where
    F: Fn(Vec2) -> Vec2 + Sync,
{
    fn sample(&self, pos: Vec2) -> Vec2 {
        self(pos)
    }
}

impl ScalarField2 for Field2 {
    fn sample(&self, pos: Vec2) -> f64 {
        self.sample_linear(pos)
    }
}

impl VectorField2 for VecField2 {
    fn sample(&self, pos: Vec2) -> Vec2 {
        self.sample_linear(pos)
    }
}

impl VectorField2 for MacVelocity2 {
    fn sample(&self, pos: Vec2) -> Vec2 {
        MacVelocity2::sample(self, pos)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantScalarField2 {
    value: f64,
}

impl ConstantScalarField2 {
    pub const fn new(value: f64) -> Self {
        Self { value }
    }

    /// Everything outside: an empty collider.
    pub const fn empty() -> Self {
        Self::new(f64::MAX)
    }

    /// Everything inside: the whole domain is fluid.
    pub const fn full() -> Self {
        Self::new(-f64::MAX)
    }
}

impl ScalarField2 for ConstantScalarField2 {
    fn sample(&self, _pos: Vec2) -> f64 {
        self.value
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantVectorField2 {
    value: Vec2,
}

impl ConstantVectorField2 {
    pub const fn new(value: Vec2) -> Self {
        Self { value }
    }

    pub const fn zero() -> Self {
        Self::new(Vec2::zero())
    }
}

impl VectorField2 for ConstantVectorField2 {
    fn sample(&self, _pos: Vec2) -> Vec2 {
        self.value
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircleSdf2 {
    pub center: Vec2,
    pub radius: f64,
}

impl CircleSdf2 {
    pub const fn new(center: Vec2, radius: f64) -> Self {
        Self { center, radius }
    }
}

impl ScalarField2 for CircleSdf2 {
    fn sample(&self, pos: Vec2) -> f64 {
        pos.sub(self.center).length() - self.radius
    }
}

pub fn is_inside_sdf(phi: f64) -> bool {
    phi < 0.0
}

/// Fraction of the segment between two samples that lies inside the zero
/// level set, assuming the field is linear in between.
pub fn fraction_inside_sdf(phi0: f64, phi1: f64) -> f64 {
    match (is_inside_sdf(phi0), is_inside_sdf(phi1)) {
        (true, true) => 1.0,
        (true, false) => phi0 / (phi0 - phi1),
        (false, true) => phi1 / (phi1 - phi0),
        (false, false) => 0.0,
    }
}

/// Classifies every cell centre: inside the collider is Solid, otherwise
/// inside the fluid is Fluid, otherwise Air.
pub fn flags_from_sdf(
    grid: Grid2,
    boundary_sdf: &dyn ScalarField2,
    fluid_sdf: &dyn ScalarField2,
) -> CellFlags {
    CellFlags::from_fn(grid.width(), grid.height(), |x, y| {
        let pos = grid.cell_center(x, y);
        if is_inside_sdf(boundary_sdf.sample(pos)) {
            CellType::Solid
        } else if is_inside_sdf(fluid_sdf.sample(pos)) {
            CellType::Fluid
        } else {
            CellType::Air
        }
    })
}
