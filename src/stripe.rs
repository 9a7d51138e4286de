//! Stripes and ATUs (Assembly Translation Units): the immutable leaves the
//! ATU resolver and submatrix assembler operate on. Grounded on `spec.md`
//! §3 "Stripe"/"ATU descriptor".

use crate::units::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StripeId(pub u64);

/// An immutable slab of the source (unpermuted) matrix at one resolution,
/// of width at most the configured `MSS(R)`.
#[derive(Debug, Clone)]
pub struct Stripe {
    pub stripe_id: StripeId,
    pub length_bins: u64,
    /// Per-bin weight, same length as `length_bins`. All-ones if the block
    /// store didn't carry weights for this stripe.
    pub bin_weights: Vec<f64>,
}

impl Stripe {
    pub fn uniform(stripe_id: StripeId, length_bins: u64) -> Self {
        Stripe {
            stripe_id,
            length_bins,
            bin_weights: vec![1.0; length_bins as usize],
        }
    }
}

/// A half-open slice `[start_incl, end_excl)` into a stripe, read in
/// `direction`. Two ATUs are fusible when they name the same stripe, the
/// same direction, and their index ranges are contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Atu {
    pub stripe_id: StripeId,
    pub start_incl: u64,
    pub end_excl: u64,
    pub direction: Direction,
}

impl Atu {
    pub fn len(&self) -> u64 {
        self.end_excl - self.start_incl
    }

    pub fn is_empty(&self) -> bool {
        self.start_incl >= self.end_excl
    }

    pub fn is_fusible_with(&self, next: &Atu) -> bool {
        self.stripe_id == next.stripe_id
            && self.direction == next.direction
            && match self.direction {
                Direction::Forward => self.end_excl == next.start_incl,
                Direction::Reversed => next.end_excl == self.start_incl,
            }
    }

    /// Fuses two contiguous, same-stripe, same-direction ATUs into one.
    /// Panics if they are not actually fusible; callers check first.
    pub fn fused_with(&self, next: &Atu) -> Atu {
        debug_assert!(self.is_fusible_with(next));
        match self.direction {
            Direction::Forward => Atu {
                stripe_id: self.stripe_id,
                start_incl: self.start_incl,
                end_excl: next.end_excl,
                direction: Direction::Forward,
            },
            Direction::Reversed => Atu {
                stripe_id: self.stripe_id,
                start_incl: next.start_incl,
                end_excl: self.end_excl,
                direction: Direction::Reversed,
            },
        }
    }
}
