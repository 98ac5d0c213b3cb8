#[macro_export]
macro_rules! tvec {
    // count helper: transform any expression into 1
    (@one $x:expr) => (1usize);
    ($elem:expr; $n:expr) => ({
        $crate::TVec::from_elem($elem, $n)
    });
    ($($x:expr),*$(,)*) => ({
        let count = 0usize $(+ tvec!(@one $x))*;
        #[allow(unused_mut)]
        let mut vec = $crate::TVec::new();
        if count <= vec.inline_size() {
            $(vec.push($x);)*
            vec
        } else {
            $crate::TVec::from_vec(vec![$($x,)*])
        }
    });
}

/// Calls a generic function with the Rust type matching a `DatumType`.
///
/// `dispatch_datum!(Self::eval_t(dt)(self, input))` expands to a match on
/// `dt` calling `Self::eval_t::<u8>`, `Self::eval_t::<i32>` or
/// `Self::eval_t::<f32>`.
#[macro_export]
macro_rules! dispatch_datum {
    ($($path:ident)::* ($dt:expr) ($($args:expr),*)) => { {
        use $crate::prelude::DatumType;
        match $dt {
            DatumType::U8   => $($path)::*::<u8>($($args),*),
            DatumType::I32  => $($path)::*::<i32>($($args),*),
            DatumType::F32  => $($path)::*::<f32>($($args),*),
        }
    } }
}
