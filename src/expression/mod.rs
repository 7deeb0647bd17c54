//! Expression module
//!
//! Translates the producer's per-actuator weights into the normalized
//! unified expression model:
//! - `FaceExpression`: the producer's 70-slot actuator ordering
//! - `UnifiedExpressions` / `UnifiedTrackingData`: the normalized output
//! - `mapper`: the weight formulas between the two

/// Declares a fieldless enum whose ordinal is its slot index, with a stable
/// name per variant and a table of all variants in slot order.
macro_rules! indexed_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(usize)]
        $vis enum $name {
            $($(#[$vmeta])* $variant,)*
        }

        impl $name {
            /// Every variant, in slot order
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            /// Number of slots
            pub const COUNT: usize = Self::ALL.len();

            /// Slot index
            pub const fn index(self) -> usize {
                self as usize
            }

            /// Stable name
            pub const fn name(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant),)*
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| v.name() == name)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

pub mod actuators;
pub mod mapper;
pub mod unified;

pub use actuators::FaceExpression;
pub use unified::{
    ExpressionShapes, UnifiedEyeData, UnifiedExpressions, UnifiedSingleEyeData,
    UnifiedTrackingData,
};
