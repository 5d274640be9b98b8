//! Walsh-Hadamard transform in Olivia's native bit/sign ordering.
//!
//! This is not the "natural" Hadamard ordering produced by a textbook
//! fast WHT: the forward and inverse butterfly networks step through
//! `step` in opposite directions and use different sign conventions,
//! matching Olivia's own bit-for-bit ordering rather than a generic
//! self-inverse transform scaled by a constant.

/// In-place forward Walsh-Hadamard transform (decode direction), length 64.
pub fn fwht(data: &mut [f32; 64]) {
    let mut step = 1usize;
    while step < data.len() {
        let mut ptr = 0usize;
        while ptr < data.len() {
            for ptr2 in ptr..ptr + step {
                let bit1 = data[ptr2];
                let bit2 = data[ptr2 + step];
                data[ptr2] = bit1 + bit2;
                data[ptr2 + step] = bit2 - bit1;
            }
            ptr += 2 * step;
        }
        step *= 2;
    }
}

/// In-place inverse Walsh-Hadamard transform (encode direction), length 64.
pub fn ifwht(data: &mut [f32; 64]) {
    let mut step = data.len() / 2;
    while step >= 1 {
        let mut ptr = 0usize;
        while ptr < data.len() {
            for ptr2 in ptr..ptr + step {
                let bit1 = data[ptr2];
                let bit2 = data[ptr2 + step];
                data[ptr2] = bit1 - bit2;
                data[ptr2 + step] = bit1 + bit2;
            }
            ptr += 2 * step;
        }
        step /= 2;
    }
}

/// Index of the largest-magnitude coefficient, and its signed value.
pub fn argmax_abs(data: &[f32; 64]) -> (usize, f32) {
    let mut best_idx = 0usize;
    let mut best_abs = data[0].abs();
    for (i, &v) in data.iter().enumerate().skip(1) {
        if v.abs() > best_abs {
            best_abs = v.abs();
            best_idx = i;
        }
    }
    (best_idx, data[best_idx])
}
