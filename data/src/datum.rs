//! Element types a `Tensor` can hold.
use std::fmt;

/// The three element types exchanged with the engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum DatumType {
    U8,
    I32,
    F32,
}

impl DatumType {
    #[inline]
    pub fn size_of(&self) -> usize {
        dispatch_datum!(std::mem::size_of(self)())
    }

    #[inline]
    pub fn alignment(&self) -> usize {
        dispatch_datum!(std::mem::align_of(self)())
    }

    pub fn is_float(&self) -> bool {
        *self == DatumType::F32
    }

    pub fn is_integer(&self) -> bool {
        !self.is_float()
    }

    /// Name used for this type in model descriptions.
    pub fn model_name(&self) -> &'static str {
        match self {
            DatumType::U8 => "unsigned char",
            DatumType::I32 => "int",
            DatumType::F32 => "float",
        }
    }
}

impl fmt::Display for DatumType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::str::FromStr for DatumType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "U8" | "u8" | "unsigned char" | "uchar" => Ok(DatumType::U8),
            "I32" | "i32" | "int" => Ok(DatumType::I32),
            "F32" | "f32" | "float" => Ok(DatumType::F32),
            _ => anyhow::bail!("Unknown type {}", s),
        }
    }
}

pub trait Datum:
    Copy
    + Send
    + Sync
    + fmt::Debug
    + fmt::Display
    + Default
    + PartialEq
    + PartialOrd
    + num_traits::NumCast
    + num_traits::Bounded
    + num_traits::Zero
    + num_traits::One
    + 'static
{
    fn name() -> &'static str;
    fn datum_type() -> DatumType;
}

macro_rules! datum {
    ($t:ty, $v:ident) => {
        impl Datum for $t {
            fn name() -> &'static str {
                stringify!($t)
            }

            fn datum_type() -> DatumType {
                DatumType::$v
            }
        }
    };
}

datum!(u8, U8);
datum!(i32, I32);
datum!(f32, F32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_names_round_trip() {
        for dt in [DatumType::U8, DatumType::I32, DatumType::F32] {
            assert_eq!(dt.model_name().parse::<DatumType>().unwrap(), dt);
        }
    }

    #[test]
    fn sizes() {
        assert_eq!(DatumType::U8.size_of(), 1);
        assert_eq!(DatumType::I32.size_of(), 4);
        assert_eq!(DatumType::F32.size_of(), 4);
    }

    #[test]
    fn unknown_type() {
        assert!("double".parse::<DatumType>().is_err());
    }
}
