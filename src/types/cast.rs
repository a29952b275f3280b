use super::definition::TypeIdentifier;
use super::primitive::{Family, Primitive};

/// Conversion required to turn a value of one primitive type into another.
///
/// Variants are ordered by cost: the binary operator resolution picks the
/// direction with the lower variant, so the declaration order is load-bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrimitiveCast {
    /// Same type, nothing to do.
    NotRequired,
    /// Integer widening within one signedness.
    ImplicitResize,
    ImplicitFloatWiden,
    ImplicitIntToFloat,
    /// Integer narrowing or a signedness change.
    ExplicitResize,
    ExplicitFloatNarrow,
    ExplicitFloatToInt,
    /// No conversion exists.
    None,
}

impl PrimitiveCast {
    /// Whether the cast may happen without a cast expression in source.
    pub fn is_implicit(self) -> bool {
        matches!(
            self,
            PrimitiveCast::NotRequired
                | PrimitiveCast::ImplicitResize
                | PrimitiveCast::ImplicitFloatWiden
                | PrimitiveCast::ImplicitIntToFloat
        )
    }

    pub fn is_possible(self) -> bool {
        self != PrimitiveCast::None
    }
}

/// Value of an operand as seen by operator resolution.
///
/// `secondary` is only set for non-negative integer literals: the smallest
/// signed type the literal also fits in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    pub ty: TypeIdentifier,
    pub secondary: Option<TypeIdentifier>,
}

impl Operand {
    pub fn new(ty: TypeIdentifier) -> Self {
        Self {
            ty,
            secondary: None,
        }
    }

    pub fn literal(ty: TypeIdentifier, secondary: Option<TypeIdentifier>) -> Self {
        Self { ty, secondary }
    }
}

/// Outcome of unifying the operand types of a binary operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryResolution {
    pub result: TypeIdentifier,
    pub left_cast: PrimitiveCast,
    pub right_cast: PrimitiveCast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryError {
    /// No conversion exists in either direction.
    Incompatible,
    /// The cheapest conversion exists but must be written out.
    ImplicitCastRequired(PrimitiveCast),
}

/// Precomputed conversion matrix over every primitive pair.
#[derive(Debug, Clone)]
pub struct CastEngine {
    matrix: [[PrimitiveCast; Primitive::COUNT]; Primitive::COUNT],
}

impl Default for CastEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CastEngine {
    pub fn new() -> Self {
        let mut matrix = [[PrimitiveCast::None; Primitive::COUNT]; Primitive::COUNT];
        for from in Primitive::ALL {
            for to in Primitive::ALL {
                matrix[from.ordinal()][to.ordinal()] = rule(from, to);
            }
        }
        Self { matrix }
    }

    pub fn classify_primitive(&self, from: Primitive, to: Primitive) -> PrimitiveCast {
        self.matrix[from.ordinal()][to.ordinal()]
    }

    /// Conversion needed to turn `source` into `target`. Non-primitive
    /// types only convert to themselves.
    pub fn classify(&self, source: &TypeIdentifier, target: &TypeIdentifier) -> PrimitiveCast {
        if source == target {
            return PrimitiveCast::NotRequired;
        }
        match (source.primitive(), target.primitive()) {
            (Some(from), Some(to)) => self.classify_primitive(from, to),
            _ => PrimitiveCast::None,
        }
    }

    pub fn is_implicit(&self, cast: PrimitiveCast) -> bool {
        cast.is_implicit()
    }

    /// Like [`classify`](Self::classify), but lets a non-negative literal
    /// reach signed targets through its secondary type.
    pub fn classify_operand(&self, operand: &Operand, target: &TypeIdentifier) -> PrimitiveCast {
        let direct = self.classify(&operand.ty, target);

        let (Some(secondary), Some(to)) = (&operand.secondary, target.primitive()) else {
            return direct;
        };
        if to.family() != Family::Signed {
            return direct;
        }

        let via_secondary = if target.size() >= secondary.size() {
            self.classify(secondary, target)
        } else if target.size() >= operand.ty.size() {
            // reinterpret the literal's bits as the signed type of its width
            PrimitiveCast::ImplicitResize
        } else {
            PrimitiveCast::ExplicitResize
        };

        // the literal is still typed as its primary; a same-width signed
        // target is a zero-byte resize, not a no-op
        let via_secondary =
            if via_secondary == PrimitiveCast::NotRequired && operand.ty != *target {
                PrimitiveCast::ImplicitResize
            } else {
                via_secondary
            };

        direct.min(via_secondary)
    }

    /// Unify the operand types of a binary operator.
    ///
    /// The cheaper direction wins; on a tie the left operand's type is kept.
    /// Only implicit conversions are accepted.
    pub fn resolve_binary(
        &self,
        left: &Operand,
        right: &Operand,
    ) -> Result<BinaryResolution, BinaryError> {
        let right_to_left = self.classify_operand(right, &left.ty);
        let left_to_right = self.classify_operand(left, &right.ty);

        if !right_to_left.is_possible() && !left_to_right.is_possible() {
            return Err(BinaryError::Incompatible);
        }

        let resolution = if right_to_left <= left_to_right {
            BinaryResolution {
                result: left.ty.clone(),
                left_cast: PrimitiveCast::NotRequired,
                right_cast: right_to_left,
            }
        } else {
            BinaryResolution {
                result: right.ty.clone(),
                left_cast: left_to_right,
                right_cast: PrimitiveCast::NotRequired,
            }
        };

        let winning = resolution.left_cast.max(resolution.right_cast);
        if !winning.is_implicit() {
            return Err(BinaryError::ImplicitCastRequired(winning));
        }

        Ok(resolution)
    }
}

fn rule(from: Primitive, to: Primitive) -> PrimitiveCast {
    if from == to {
        return PrimitiveCast::NotRequired;
    }

    match (from.family(), to.family()) {
        (Family::Signed, Family::Signed) | (Family::Unsigned, Family::Unsigned) => {
            if to.size() > from.size() {
                PrimitiveCast::ImplicitResize
            } else {
                PrimitiveCast::ExplicitResize
            }
        }
        (Family::Signed, Family::Unsigned) | (Family::Unsigned, Family::Signed) => {
            PrimitiveCast::ExplicitResize
        }
        (Family::Signed | Family::Unsigned, Family::Float) => {
            if from.size() <= 8 {
                PrimitiveCast::ImplicitIntToFloat
            } else {
                PrimitiveCast::None
            }
        }
        (Family::Float, Family::Signed | Family::Unsigned) => PrimitiveCast::ExplicitFloatToInt,
        (Family::Float, Family::Float) => {
            if to.size() > from.size() {
                PrimitiveCast::ImplicitFloatWiden
            } else {
                PrimitiveCast::ExplicitFloatNarrow
            }
        }
        _ => PrimitiveCast::None,
    }
}
