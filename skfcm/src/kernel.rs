/// Gaussian radial basis kernel, `exp(-(x - y)^2 / sigma^2)`.
///
/// Returns 1 for identical intensities and decays toward 0 as they separate.
/// `sigma == 0` is undefined; [`Config::validate`](crate::Config::validate)
/// rejects it before any run.
#[inline]
pub fn gaussian_kernel(x: f64, y: f64, sigma: f64) -> f64 {
    let d = x - y;
    (-(d * d) / (sigma * sigma)).exp()
}
