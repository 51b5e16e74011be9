use rand::Rng;

pub const DEFAULT_VOLATILITY: f64 = 0.015;

/// Multiplies `price` by `1 + u` with `u` drawn uniformly from
/// `[-volatility, +volatility]`, so the result stays within
/// `price * (1 ± volatility)`. Zero price or non-positive volatility pass
/// through unchanged.
pub fn jitter_price<R: Rng>(rng: &mut R, price: f64, volatility: f64) -> f64 {
    if price == 0.0 || volatility <= 0.0 {
        return price;
    }
    let drift = rng.gen_range(-volatility..=volatility);
    price * (1.0 + drift)
}
