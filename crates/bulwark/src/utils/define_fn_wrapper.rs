// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Generates a cloneable, thread-safe wrapper around a user supplied closure.
///
/// The closure is stored as `Arc<dyn Fn(..) -> .. + Send + Sync>` so that builders, breakers and
/// guards can be cloned freely while sharing the callback.
///
/// ```rust,ignore
/// define_fn_wrapper!(ReadyToTrip(Fn(&Counts) -> bool));
/// define_fn_wrapper!(OnStateChange(Fn(StateChangeArgs)));
/// ```
///
/// The generated type exposes `new(f)`, `call(args..)` and implements `Clone` and `Debug`.
macro_rules! define_fn_wrapper {
    ($name:ident(Fn($($param_name:ident: $param_ty:ty),*) -> $return_ty:ty)) => {
        pub(crate) struct $name(std::sync::Arc<dyn Fn($($param_ty),*) -> $return_ty + Send + Sync>);

        impl $name {
            pub(crate) fn new<F>(f: F) -> Self
            where
                F: Fn($($param_ty),*) -> $return_ty + Send + Sync + 'static,
            {
                Self(std::sync::Arc::new(f))
            }

            pub(crate) fn call(&self, $($param_name: $param_ty),*) -> $return_ty {
                (self.0)($($param_name),*)
            }
        }

        impl Clone for $name {
            fn clone(&self) -> Self {
                Self(std::sync::Arc::clone(&self.0))
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name)).finish()
            }
        }
    };

    ($name:ident(Fn($param1:ty) -> $return_ty:ty)) => {
        $crate::utils::define_fn_wrapper!($name(Fn(arg1: $param1) -> $return_ty));
    };

    ($name:ident(Fn($param1:ty))) => {
        $crate::utils::define_fn_wrapper!($name(Fn(arg1: $param1) -> ()));
    };
}

pub(crate) use define_fn_wrapper;
