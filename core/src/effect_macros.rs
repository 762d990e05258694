//! Declarative macros for ergonomic effect construction

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use sabalitos_core::async_effect;
///
/// async_effect! {
///     let snapshot = persistence.load().await;
///     Some(ShopAction::Loaded { snapshot })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use sabalitos_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_secs(3),
///     action: ShopAction::DismissFeedback
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}

/// Create a debounced action: a `Delay` registered under an id, so scheduling
/// it again before it fires replaces the pending one.
///
/// # Example
///
/// ```rust,ignore
/// use sabalitos_core::debounce;
/// use std::time::Duration;
///
/// debounce! {
///     id: "persist:catalog",
///     duration: Duration::from_millis(500),
///     action: ShopAction::Flush(StorageKey::Catalog)
/// }
/// ```
#[macro_export]
macro_rules! debounce {
    (
        id: $id:expr,
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Cancellable {
            id: $crate::effect::EffectId::new($id),
            effect: ::std::boxed::Box::new($crate::delay! {
                duration: $duration,
                action: $action
            }),
        }
    };
}
