//! Service key types for the dependency injection container.

use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(1);

/// Key for service storage and lookup.
///
/// Services are registered under a name, usually the short name of the type
/// that implements them, or under a symbol whose identity is unique even when
/// two symbols share a description.
///
/// # Examples
///
/// ```rust
/// use lightspring::Key;
///
/// struct UserService;
///
/// assert_eq!(Key::of::<UserService>(), Key::named("UserService"));
///
/// let a = Key::symbol("token");
/// let b = Key::symbol("token");
/// assert_ne!(a, b);
/// assert_eq!(a.to_string(), "Symbol(token)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// Plain string name
    Name(Cow<'static, str>),
    /// Unique symbol: description plus an identity allocated at creation
    Symbol(&'static str, u64),
}

impl Key {
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Key::Name(name.into())
    }

    /// Allocates a fresh symbol. Two calls never produce equal keys.
    pub fn symbol(description: &'static str) -> Self {
        Key::Symbol(description, NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed))
    }

    /// Key derived from the short name of `T`.
    pub fn of<T: ?Sized>() -> Self {
        Key::Name(Cow::Borrowed(short_type_name::<T>()))
    }

    /// The name or the symbol description.
    pub fn display_name(&self) -> &str {
        match self {
            Key::Name(name) => name,
            Key::Symbol(description, _) => description,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Symbol(description, _) => write!(f, "Symbol({})", description),
        }
    }
}

impl From<&'static str> for Key {
    fn from(name: &'static str) -> Self {
        Key::Name(Cow::Borrowed(name))
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(Cow::Owned(name))
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}

/// Last path segment of `std::any::type_name`, without generic arguments.
///
/// `my_app::services::UserService` becomes `UserService`.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = match full.find('<') {
        Some(pos) => &full[..pos],
        None => full,
    };
    match base.rfind("::") {
        Some(pos) => &base[pos + 2..],
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod nested {
        pub struct Repository<T>(pub T);
    }

    #[test]
    fn short_name_strips_path_and_generics() {
        assert_eq!(short_type_name::<nested::Repository<u8>>(), "Repository");
        assert_eq!(short_type_name::<String>(), "String");
        assert_eq!(short_type_name::<u32>(), "u32");
    }

    #[test]
    fn owned_and_borrowed_names_are_equal() {
        assert_eq!(Key::from("A"), Key::from("A".to_string()));
    }
}
