/// ceil(x / y) without going through floats
pub fn ceil_div(x: usize, y: usize) -> usize {
    x.div_ceil(y)
}
