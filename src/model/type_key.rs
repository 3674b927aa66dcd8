use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde_json::Value;

use super::Response;

/// Identity of a Rust type, used as the key of every registry table.
///
/// Equality and hashing use the `TypeId` only; the name is kept for logs and
/// error messages.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path (`app::orders::Ping` becomes `Ping`).
    pub fn short_name(&self) -> &'static str {
        let base = match self.name.find('<') {
            Some(generics) => &self.name[..generics],
            None => self.name,
        };
        let start = base.rfind("::").map(|i| i + 2).unwrap_or(0);
        &self.name[start..]
    }

    /// Lookup key for a type known only by its `TypeId`.
    pub(crate) fn dynamic(id: TypeId) -> Self {
        Self {
            id,
            name: "<dynamic>",
        }
    }

    pub(crate) fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeKey").field(&self.name).finish()
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A response type captured at registration time.
///
/// Carries the constructor and serializer for the concrete type so the
/// dispatcher can build and render responses without knowing the type
/// statically.
#[derive(Clone, Copy)]
pub struct ResponseType {
    key: TypeKey,
    instantiate: fn() -> Box<dyn Any + Send + Sync>,
    to_json: fn(&dyn Any) -> serde_json::Result<Value>,
}

impl ResponseType {
    pub fn of<P: Response>() -> Self {
        Self {
            key: TypeKey::of::<P>(),
            instantiate: instantiate::<P>,
            to_json: to_json::<P>,
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn name(&self) -> &'static str {
        self.key.name()
    }

    /// Build a fresh, default-valued response.
    pub fn instantiate(&self) -> Box<dyn Any + Send + Sync> {
        (self.instantiate)()
    }

    pub(crate) fn render(&self, value: &dyn Any) -> serde_json::Result<Value> {
        (self.to_json)(value)
    }
}

impl PartialEq for ResponseType {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ResponseType {}

impl fmt::Debug for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResponseType").field(&self.key.name()).finish()
    }
}

fn instantiate<P: Response>() -> Box<dyn Any + Send + Sync> {
    Box::new(P::default())
}

fn to_json<P: Response>(value: &dyn Any) -> serde_json::Result<Value> {
    match value.downcast_ref::<P>() {
        Some(response) => serde_json::to_value(response),
        None => Err(serde::ser::Error::custom(format!(
            "value is not a {}",
            std::any::type_name::<P>()
        ))),
    }
}
