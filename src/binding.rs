use crate::error::BindingError;
use crate::types::{Field, Group, NsName};
use crate::value::Value;

/// How the codec reaches application objects.
///
/// The reader asks the binding to `construct` an object for each decoded
/// group and `set`s its fields; the writer asks for an object's group and
/// `get`s its fields. Nested groups are themselves `Self::Object`s, which is
/// why values are parameterized over the object type.
///
/// `MessageBinding` (map based) and the serde bridge are the bindings that
/// ship with the crate; generated or hand-written bindings plug in the same
/// way.
pub trait ObjectBinding {
    type Object;

    /// Create an empty object for `group`.
    fn construct(&self, group: &Group) -> Result<Self::Object, BindingError>;

    /// The concrete group of `object`. Looked up by name in the schema, so
    /// an unqualified name is fine when it is unambiguous.
    fn group_of(&self, object: &Self::Object) -> Result<NsName, BindingError>;

    /// Read a field. `None` means absent, which is only legal for optional
    /// fields.
    fn get<'a>(
        &self,
        object: &'a Self::Object,
        field: &Field,
    ) -> Result<Option<Value<&'a Self::Object>>, BindingError>;

    /// Store a decoded field value. Absent optional fields are never set.
    fn set(
        &self,
        object: &mut Self::Object,
        field: &Field,
        value: Value<Self::Object>,
    ) -> Result<(), BindingError>;
}
