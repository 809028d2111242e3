use crate::parallel::for_each_indexed;

/// Dense row-major 2-D container. Index `(x, y)` lives at `y * width + x`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Array2<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T: Copy + Send + Sync> Array2<T> {
    pub fn new(width: usize, height: usize, fill: T) -> Self {
        Self {
            width,
            height,
            data: vec![fill; width * height],
        }
    }

    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> T + Sync) -> Self
    where
        T: Default,
    {
        let mut array = Self::new(width, height, T::default());
        array.fill_with_index(f);
        array
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn idx(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y * self.width + x
    }

    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[self.idx(x, y)]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.idx(x, y);
        self.data[idx] = value;
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        let idx = self.idx(x, y);
        &mut self.data[idx]
    }

    pub fn clamp_coord(&self, x: isize, y: isize) -> (usize, usize) {
        let max_x = self.width as isize - 1;
        let max_y = self.height as isize - 1;
        (x.clamp(0, max_x) as usize, y.clamp(0, max_y) as usize)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Reallocates to `width x height` filled with `fill`. Contents survive
    /// only when the shape is unchanged.
    pub fn resize(&mut self, width: usize, height: usize, fill: T) {
        if self.width == width && self.height == height {
            return;
        }
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(width * height, fill);
    }

    pub fn clear(&mut self) {
        self.width = 0;
        self.height = 0;
        self.data.clear();
    }

    pub fn fill(&mut self, value: T) {
        for_each_indexed(&mut self.data, self.width, |_, _, slot| *slot = value);
    }

    pub fn copy_from(&mut self, other: &Self) {
        assert_eq!(self.size(), other.size(), "array size mismatch");
        self.data.copy_from_slice(&other.data);
    }

    pub fn fill_with_index(&mut self, f: impl Fn(usize, usize) -> T + Sync) {
        for_each_indexed(&mut self.data, self.width, |x, y, slot| *slot = f(x, y));
    }

    pub fn update_with_index(&mut self, f: impl Fn(usize, usize, T) -> T + Sync) {
        for_each_indexed(&mut self.data, self.width, |x, y, slot| *slot = f(x, y, *slot));
    }

    pub fn for_each_index(&self, mut f: impl FnMut(usize, usize)) {
        for y in 0..self.height {
            for x in 0..self.width {
                f(x, y);
            }
        }
    }
}
