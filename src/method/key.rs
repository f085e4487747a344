//! Cache key construction.
//!
//! Keys have the shape `prefix:method:arg1:arg2:...:kw1:val1:kw2:val2`.
//! Every argument is rendered with its `Display` implementation. By default
//! nothing is escaped, so an argument containing `:` can produce the same key
//! as a different argument list; [`KeyOptions::escape_delimiter`] turns
//! escaping on.

use std::fmt::{self, Display, Write};

use crate::error::{CacheError, CacheResult};

/// Rendered arguments of one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyParts {
    positional: Vec<String>,
    keyword: Vec<(String, String)>,
}

impl KeyParts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render all arguments of `args`.
    pub fn from_args<A: KeyArgs + ?Sized>(args: &A) -> Result<Self, fmt::Error> {
        let mut parts = Self::new();
        args.write_key(&mut parts)?;
        Ok(parts)
    }

    /// Append a positional argument.
    pub fn arg(&mut self, value: &dyn Display) -> fmt::Result {
        let rendered = render(value)?;
        self.positional.push(rendered);
        Ok(())
    }

    /// Append a keyword argument. Pairs keep the order they are appended in.
    pub fn kwarg(&mut self, name: &str, value: &dyn Display) -> fmt::Result {
        let rendered = render(value)?;
        self.keyword.push((name.to_string(), rendered));
        Ok(())
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    pub fn keyword(&self) -> &[(String, String)] {
        &self.keyword
    }

    fn sort_keywords(&mut self) {
        // stable: repeated names keep their relative order
        self.keyword.sort_by(|a, b| a.0.cmp(&b.0));
    }

    fn escape(&mut self) {
        for arg in &mut self.positional {
            *arg = escape_delimiter(arg);
        }
        for (name, value) in &mut self.keyword {
            *name = escape_delimiter(name);
            *value = escape_delimiter(value);
        }
    }
}

fn render(value: &dyn Display) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write!(out, "{}", value)?;
    Ok(out)
}

fn escape_delimiter(part: &str) -> String {
    part.replace('\\', "\\\\").replace(':', "\\:")
}

/// Join a prefix, a method name and rendered arguments into a key.
///
/// Pure and deterministic: equal inputs in equal order give byte-identical
/// keys.
pub fn build_key(prefix: &str, method_name: &str, parts: &KeyParts) -> String {
    let positional = parts.positional.join(":");
    let keyword = parts
        .keyword
        .iter()
        .map(|(name, value)| format!("{}:{}", name, value))
        .collect::<Vec<_>>()
        .join(":");

    format!("{}:{}:{}:{}", prefix, method_name, positional, keyword)
}

/// Arguments that can be written into a cache key.
///
/// Implemented for tuples, slices and vectors of `Display` values, which
/// all count as positional. Argument structs implement it by hand to decide
/// which fields are positional and which are keyword arguments:
///
/// ```rust
/// use std::fmt;
/// use method_cache::method::{KeyArgs, KeyParts};
///
/// struct Search {
///     query: String,
///     limit: Option<u32>,
/// }
///
/// impl KeyArgs for Search {
///     fn write_key(&self, parts: &mut KeyParts) -> fmt::Result {
///         parts.arg(&self.query)?;
///         if let Some(limit) = self.limit {
///             parts.kwarg("limit", &limit)?;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait KeyArgs {
    fn write_key(&self, parts: &mut KeyParts) -> fmt::Result;
}

impl<T: KeyArgs + ?Sized> KeyArgs for &T {
    fn write_key(&self, parts: &mut KeyParts) -> fmt::Result {
        (**self).write_key(parts)
    }
}

impl KeyArgs for () {
    fn write_key(&self, _parts: &mut KeyParts) -> fmt::Result {
        Ok(())
    }
}

impl<T: Display> KeyArgs for [T] {
    fn write_key(&self, parts: &mut KeyParts) -> fmt::Result {
        self.iter().try_for_each(|value| parts.arg(value))
    }
}

impl<T: Display> KeyArgs for Vec<T> {
    fn write_key(&self, parts: &mut KeyParts) -> fmt::Result {
        self.as_slice().write_key(parts)
    }
}

macro_rules! impl_key_args_for_tuple {
    ($($name:ident),+) => {
        impl<$($name: Display),+> KeyArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn write_key(&self, parts: &mut KeyParts) -> fmt::Result {
                let ($($name,)+) = self;
                $(parts.arg($name)?;)+
                Ok(())
            }
        }
    };
}

impl_key_args_for_tuple!(A);
impl_key_args_for_tuple!(A, B);
impl_key_args_for_tuple!(A, B, C);
impl_key_args_for_tuple!(A, B, C, D);
impl_key_args_for_tuple!(A, B, C, D, E);
impl_key_args_for_tuple!(A, B, C, D, E, F);
impl_key_args_for_tuple!(A, B, C, D, E, F, G);
impl_key_args_for_tuple!(A, B, C, D, E, F, G, H);

/// How argument parts are encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyOptions {
    /// Escape `\` and `:` inside every rendered part.
    pub escape_delimiter: bool,

    /// Sort keyword pairs by name instead of keeping call order.
    pub sort_keyword_args: bool,
}

/// Layout of a key from prefix, method name and rendered arguments.
pub type KeyScheme = fn(&str, &str, &KeyParts) -> String;

/// A key prefix, encoding options and key layout.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    prefix: String,
    options: KeyOptions,
    scheme: KeyScheme,
}

impl KeyBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            options: KeyOptions::default(),
            scheme: build_key,
        }
    }

    #[must_use]
    pub fn options(mut self, options: KeyOptions) -> Self {
        self.options = options;
        self
    }

    /// Lay keys out with `scheme` instead of [`build_key`].
    ///
    /// Options are applied to the parts before `scheme` sees them.
    #[must_use]
    pub fn scheme(mut self, scheme: KeyScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn key_options(&self) -> KeyOptions {
        self.options
    }

    /// Build the key for a call of `method_name` with `args`.
    ///
    /// # Errors
    /// Returns [`CacheError::KeyFormat`] if an argument fails to render.
    pub fn build<A: KeyArgs + ?Sized>(&self, method_name: &str, args: &A) -> CacheResult<String> {
        let mut parts =
            KeyParts::from_args(args).map_err(|_| CacheError::key_format(method_name))?;

        if self.options.sort_keyword_args {
            parts.sort_keywords();
        }
        if self.options.escape_delimiter {
            parts.escape();
        }

        Ok((self.scheme)(&self.prefix, method_name, &parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Compute {
        x: i64,
        y: Option<i64>,
    }

    impl KeyArgs for Compute {
        fn write_key(&self, parts: &mut KeyParts) -> fmt::Result {
            parts.arg(&self.x)?;
            if let Some(y) = self.y {
                parts.kwarg("y", &y)?;
            }
            Ok(())
        }
    }

    struct Pairs(Vec<(&'static str, &'static str)>);

    impl KeyArgs for Pairs {
        fn write_key(&self, parts: &mut KeyParts) -> fmt::Result {
            for (name, value) in &self.0 {
                parts.kwarg(name, value)?;
            }
            Ok(())
        }
    }

    struct Unprintable;

    impl Display for Unprintable {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    #[test]
    fn test_key_layout() {
        let mut parts = KeyParts::new();
        parts.arg(&1).unwrap();
        parts.arg(&"two").unwrap();
        parts.kwarg("a", &3).unwrap();
        parts.kwarg("b", &true).unwrap();

        assert_eq!(build_key("p", "m", &parts), "p:m:1:two:a:3:b:true");
    }

    #[test]
    fn test_key_without_arguments() {
        let keys = KeyBuilder::new("p");
        assert_eq!(keys.build("m", &()).unwrap(), "p:m::");
    }

    #[test]
    fn test_keyword_only_key() {
        let keys = KeyBuilder::new("p");
        let key = keys.build("m", &Pairs(vec![("a", "1")])).unwrap();
        assert_eq!(key, "p:m::a:1");
    }

    #[test]
    fn test_key_is_deterministic() {
        let keys = KeyBuilder::new("p");
        let args = Compute { x: 5, y: Some(2) };

        let first = keys.build("compute", &args).unwrap();
        let second = keys.build("compute", &args).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, "p:compute:5:y:2");
    }

    #[test]
    fn test_tuples_slices_and_vecs_agree() {
        let keys = KeyBuilder::new("p");
        let from_tuple = keys.build("m", &(1, 2, 3)).unwrap();
        let from_slice = keys.build("m", &[1, 2, 3][..]).unwrap();
        let from_vec = keys.build("m", &vec![1, 2, 3]).unwrap();

        assert_eq!(from_tuple, "p:m:1:2:3:");
        assert_eq!(from_tuple, from_slice);
        assert_eq!(from_tuple, from_vec);
    }

    #[test]
    fn test_keyword_order_matters_by_default() {
        let keys = KeyBuilder::new("p");
        let ab = keys.build("m", &Pairs(vec![("a", "1"), ("b", "2")])).unwrap();
        let ba = keys.build("m", &Pairs(vec![("b", "2"), ("a", "1")])).unwrap();

        assert_ne!(ab, ba);
    }

    #[test]
    fn test_sorted_keywords_ignore_call_order() {
        let keys = KeyBuilder::new("p").options(KeyOptions {
            sort_keyword_args: true,
            ..Default::default()
        });
        let ab = keys.build("m", &Pairs(vec![("a", "1"), ("b", "2")])).unwrap();
        let ba = keys.build("m", &Pairs(vec![("b", "2"), ("a", "1")])).unwrap();

        assert_eq!(ab, ba);
        assert_eq!(ab, "p:m::a:1:b:2");
    }

    #[test]
    fn test_delimiter_collision_without_escaping() {
        let keys = KeyBuilder::new("p");
        let joined = keys.build("m", &("a:b",)).unwrap();
        let split = keys.build("m", &("a", "b")).unwrap();

        assert_eq!(joined, split);
    }

    #[test]
    fn test_escaping_separates_colliding_arguments() {
        let keys = KeyBuilder::new("p").options(KeyOptions {
            escape_delimiter: true,
            ..Default::default()
        });
        let joined = keys.build("m", &("a:b",)).unwrap();
        let split = keys.build("m", &("a", "b")).unwrap();

        assert_ne!(joined, split);
        assert_eq!(joined, r"p:m:a\:b:");
        assert_eq!(keys.build("m", &(r"a\",)).unwrap(), r"p:m:a\\:");
    }

    #[test]
    fn test_failing_display_is_key_error() {
        let keys = KeyBuilder::new("p");
        let err = keys.build("render", &(1, Unprintable)).unwrap_err();

        assert!(matches!(err, CacheError::KeyFormat { ref method } if method == "render"));
    }

    fn slash_scheme(prefix: &str, method_name: &str, parts: &KeyParts) -> String {
        let mut segments = vec![prefix.to_string(), method_name.to_string()];
        segments.extend(parts.positional().iter().cloned());
        segments.extend(parts.keyword().iter().map(|(k, v)| format!("{}={}", k, v)));
        segments.join("/")
    }

    #[test]
    fn test_custom_scheme_replaces_layout() {
        let keys = KeyBuilder::new("v2")
            .options(KeyOptions {
                sort_keyword_args: true,
                ..Default::default()
            })
            .scheme(slash_scheme);

        let key = keys
            .build("m", &Pairs(vec![("b", "2"), ("a", "1")]))
            .unwrap();

        assert_eq!(key, "v2/m/a=1/b=2");
        assert_eq!(keys.build("m", &(5,)).unwrap(), "v2/m/5");
    }
}
