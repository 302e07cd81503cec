mod gaussian_generator;

pub use gaussian_generator::GaussianGenerator;
