//! `ComplexScalar` (C2): the immutable (re, im) value type used wherever a
//! single complex number flows through the engine — scalar operands,
//! reduction results, and the transcendental closed forms unary ops promote
//! real scalars through (spec §4.7).

use num_complex::Complex64;

/// An immutable complex scalar. `im == 0.0` makes it morally equal to a
/// real scalar; the engine converts it back to a plain number on output
/// wherever that's observable (spec §3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplexScalar {
    pub re: f64,
    pub im: f64,
}

impl ComplexScalar {
    pub fn new(re: f64, im: f64) -> Self {
        ComplexScalar { re, im }
    }

    pub fn real(re: f64) -> Self {
        ComplexScalar { re, im: 0.0 }
    }

    pub fn is_real(self) -> bool {
        self.im == 0.0
    }

    pub fn to_complex64(self) -> Complex64 {
        Complex64::new(self.re, self.im)
    }

    pub fn from_complex64(z: Complex64) -> Self {
        ComplexScalar { re: z.re, im: z.im }
    }

    pub fn add(self, other: Self) -> Self {
        ComplexScalar::new(self.re + other.re, self.im + other.im)
    }

    pub fn sub(self, other: Self) -> Self {
        ComplexScalar::new(self.re - other.re, self.im - other.im)
    }

    pub fn mul(self, other: Self) -> Self {
        ComplexScalar::new(
            self.re * other.re - self.im * other.im,
            self.re * other.im + self.im * other.re,
        )
    }

    /// Complex division via Smith's formula: rescale by whichever of
    /// `|re(y)|`/`|im(y)|` is larger before dividing, guarding against
    /// under/overflow that a naive `(ac+bd)/(c²+d²)` would suffer for large
    /// or small operands (spec §4.7).
    pub fn div(self, other: Self) -> Self {
        let (a, b) = (self.re, self.im);
        let (c, d) = (other.re, other.im);
        if c == 0.0 && d == 0.0 {
            return ComplexScalar::new(f64::NAN, f64::NAN);
        }
        if c.abs() >= d.abs() {
            let r = d / c;
            let den = c + d * r;
            ComplexScalar::new((a + b * r) / den, (b - a * r) / den)
        } else {
            let r = c / d;
            let den = c * r + d;
            ComplexScalar::new((a * r + b) / den, (b * r - a) / den)
        }
    }

    pub fn neg(self) -> Self {
        ComplexScalar::new(-self.re, -self.im)
    }

    pub fn conj(self) -> Self {
        ComplexScalar::new(self.re, -self.im)
    }

    pub fn inv(self) -> Self {
        ComplexScalar::real(1.0).div(self)
    }

    /// `‖(x,y)‖` via the scale-by-larger formula, avoiding overflow for
    /// large re/im (spec §4.7).
    pub fn norm(self) -> f64 {
        hypot(self.re, self.im)
    }

    pub fn arg(self) -> f64 {
        self.im.atan2(self.re)
    }

    pub fn sqrt(self) -> Self {
        csqrt(self)
    }

    pub fn exp(self) -> Self {
        let r = self.re.exp();
        ComplexScalar::new(r * self.im.cos(), r * self.im.sin())
    }

    pub fn log(self) -> Self {
        clog(self)
    }

    pub fn pow(self, y: Self) -> Self {
        cpow(self, y)
    }

    pub fn sin(self) -> Self {
        ComplexScalar::new(
            self.re.sin() * self.im.cosh(),
            self.re.cos() * self.im.sinh(),
        )
    }

    pub fn cos(self) -> Self {
        ComplexScalar::new(
            self.re.cos() * self.im.cosh(),
            -self.re.sin() * self.im.sinh(),
        )
    }

    pub fn tan(self) -> Self {
        self.sin().div(self.cos())
    }

    pub fn cot(self) -> Self {
        self.cos().div(self.sin())
    }

    pub fn sinh(self) -> Self {
        ComplexScalar::new(
            self.re.sinh() * self.im.cos(),
            self.re.cosh() * self.im.sin(),
        )
    }

    pub fn cosh(self) -> Self {
        ComplexScalar::new(
            self.re.cosh() * self.im.cos(),
            self.re.sinh() * self.im.sin(),
        )
    }

    pub fn tanh(self) -> Self {
        self.sinh().div(self.cosh())
    }

    pub fn coth(self) -> Self {
        self.cosh().div(self.sinh())
    }

    pub fn asin(self) -> Self {
        // -i * ln(iz + sqrt(1 - z^2))
        let i = ComplexScalar::new(0.0, 1.0);
        let one_minus_z2 = ComplexScalar::real(1.0).sub(self.mul(self));
        i.neg().mul(i.mul(self).add(one_minus_z2.sqrt()).log())
    }

    pub fn acos(self) -> Self {
        let i = ComplexScalar::new(0.0, 1.0);
        let one_minus_z2 = ComplexScalar::real(1.0).sub(self.mul(self));
        i.neg().mul(self.add(i.mul(one_minus_z2.sqrt())).log())
    }

    pub fn atan(self) -> Self {
        let i = ComplexScalar::new(0.0, 1.0);
        let num = i.add(self);
        let den = i.sub(self);
        i.div(ComplexScalar::new(2.0, 0.0)).mul(num.div(den).log())
    }

    pub fn asinh(self) -> Self {
        self.add(self.mul(self).add(ComplexScalar::real(1.0)).sqrt()).log()
    }

    pub fn acosh(self) -> Self {
        self.add(self.mul(self).sub(ComplexScalar::real(1.0)).sqrt()).log()
    }

    pub fn atanh(self) -> Self {
        let num = ComplexScalar::real(1.0).add(self);
        let den = ComplexScalar::real(1.0).sub(self);
        num.div(den).log().div(ComplexScalar::new(2.0, 0.0))
    }
}

/// Scale-by-larger hypotenuse, guarding against overflow for large inputs.
fn hypot(x: f64, y: f64) -> f64 {
    x.hypot(y)
}

/// `sqrt` with the branch rules spec §4.7 requires: non-finite inputs
/// propagate to `[NaN, NaN]` except where branch rules force specific
/// infinities (matching `f64::sqrt`'s own IEEE-754 branch behavior for the
/// purely real case).
fn csqrt(z: ComplexScalar) -> ComplexScalar {
    if z.re.is_nan() || z.im.is_nan() {
        return ComplexScalar::new(f64::NAN, f64::NAN);
    }
    if z.im == 0.0 {
        if z.re >= 0.0 {
            return ComplexScalar::real(z.re.sqrt());
        }
        return ComplexScalar::new(0.0, (-z.re).sqrt());
    }
    let r = z.norm();
    let re = ((r + z.re) / 2.0).sqrt();
    let im = ((r - z.re) / 2.0).sqrt() * z.im.signum();
    ComplexScalar::new(re, im)
}

fn clog(z: ComplexScalar) -> ComplexScalar {
    if z.re == 0.0 && z.im == 0.0 {
        return ComplexScalar::new(f64::NEG_INFINITY, 0.0);
    }
    ComplexScalar::new(z.norm().ln(), z.arg())
}

/// `cpow(re,0,y,0)` returns the real `re.powf(y)` when `re >= 0` or `y` is
/// an integer; otherwise routes through `exp(y * log(re))` (spec §4.7).
fn cpow(base: ComplexScalar, exp: ComplexScalar) -> ComplexScalar {
    if base.is_real() && exp.is_real() {
        if base.re >= 0.0 || exp.re.fract() == 0.0 {
            return ComplexScalar::real(base.re.powf(exp.re));
        }
    }
    if base.re == 0.0 && base.im == 0.0 {
        if exp.re == 0.0 && exp.im == 0.0 {
            return ComplexScalar::real(1.0);
        }
        return ComplexScalar::real(0.0);
    }
    exp.mul(base.log()).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_sub_mul() {
        let a = ComplexScalar::new(1.0, 2.0);
        let b = ComplexScalar::new(3.0, -1.0);
        assert_eq!(a.add(b), ComplexScalar::new(4.0, 1.0));
        assert_eq!(a.sub(b), ComplexScalar::new(-2.0, 3.0));
        assert_eq!(a.mul(b), ComplexScalar::new(5.0, 5.0));
    }

    #[test]
    fn div_matches_expected() {
        let a = ComplexScalar::new(1.0, 0.0);
        let b = ComplexScalar::new(0.0, 1.0);
        let q = a.div(b);
        assert!((q.re - 0.0).abs() < 1e-12);
        assert!((q.im - -1.0).abs() < 1e-12);
    }

    #[test]
    fn div_by_zero_is_nan() {
        let a = ComplexScalar::new(1.0, 1.0);
        let z = ComplexScalar::new(0.0, 0.0);
        let q = a.div(z);
        assert!(q.re.is_nan() && q.im.is_nan());
    }

    #[test]
    fn sqrt_of_negative_real_is_imaginary() {
        // S4: sqrt(-4) == (0, 2)
        let z = ComplexScalar::real(-4.0).sqrt();
        assert!((z.re - 0.0).abs() < 1e-12);
        assert!((z.im - 2.0).abs() < 1e-12);
    }

    #[test]
    fn sqrt_of_nonfinite_is_nan() {
        let z = ComplexScalar::new(f64::NAN, 1.0).sqrt();
        assert!(z.re.is_nan() && z.im.is_nan());
    }

    #[test]
    fn pow_integer_exponent_of_negative_base_is_real() {
        let z = cpow(ComplexScalar::real(-2.0), ComplexScalar::real(3.0));
        assert!(z.is_real());
        assert!((z.re - -8.0).abs() < 1e-9);
    }

    #[test]
    fn pow_fractional_exponent_of_negative_base_goes_complex() {
        let z = cpow(ComplexScalar::real(-1.0), ComplexScalar::real(0.5));
        assert!(!z.is_real());
        // sqrt(-1) == i
        assert!((z.re - 0.0).abs() < 1e-9);
        assert!((z.im - 1.0).abs() < 1e-9);
    }

    #[test]
    fn norm_uses_scaled_hypot() {
        let z = ComplexScalar::new(3.0, 4.0);
        assert_eq!(z.norm(), 5.0);
    }

    #[test]
    fn conj_and_inv() {
        let z = ComplexScalar::new(1.0, 1.0);
        assert_eq!(z.conj(), ComplexScalar::new(1.0, -1.0));
        let inv = z.inv();
        let back = inv.inv();
        assert!((back.re - z.re).abs() < 1e-9);
        assert!((back.im - z.im).abs() < 1e-9);
    }
}
