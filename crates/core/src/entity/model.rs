use crate::error::Result;
use crate::value::{PropertyType, PropertyValue};

/// Static description of one model property.
///
/// Getters and setters are plain function pointers so descriptor tables can
/// be declared as `static` items and built once.
pub struct Field<T> {
    name: &'static str,
    ty: PropertyType,
    get: fn(&T) -> PropertyValue,
    set: fn(&mut T, PropertyValue) -> Result<()>,
}

impl<T> Field<T> {
    pub const fn new(
        name: &'static str,
        ty: PropertyType,
        get: fn(&T) -> PropertyValue,
        set: fn(&mut T, PropertyValue) -> Result<()>,
    ) -> Self {
        Self { name, ty, get, set }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn property_type(&self) -> &PropertyType {
        &self.ty
    }

    pub fn get(&self, item: &T) -> PropertyValue {
        (self.get)(item)
    }

    pub fn set(&self, item: &mut T, value: PropertyValue) -> Result<()> {
        (self.set)(item, value)
    }
}

impl<T> std::fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish()
    }
}

/// An application type that maps onto table rows.
///
/// ```
/// use tablemap_core::entity::{Field, TableModel};
/// use tablemap_core::value::PropertyType;
///
/// #[derive(Debug, Default)]
/// struct Customer {
///     region: String,
///     id: String,
///     name: String,
///     visits: Option<i64>,
/// }
///
/// static CUSTOMER_FIELDS: [Field<Customer>; 2] = [
///     Field::new(
///         "Name",
///         PropertyType::String,
///         |c| c.name.clone().into(),
///         |c, v| {
///             c.name = v.try_into()?;
///             Ok(())
///         },
///     ),
///     Field::new(
///         "Visits",
///         PropertyType::Nullable(&PropertyType::Int64),
///         |c| c.visits.into(),
///         |c, v| {
///             c.visits = v.try_into()?;
///             Ok(())
///         },
///     ),
/// ];
///
/// impl TableModel for Customer {
///     fn fields() -> &'static [Field<Self>] {
///         &CUSTOMER_FIELDS
///     }
///
///     fn partition_key(&self) -> &str {
///         &self.region
///     }
///
///     fn row_key(&self) -> &str {
///         &self.id
///     }
///
///     fn set_keys(&mut self, partition_key: &str, row_key: &str) {
///         self.region = partition_key.to_string();
///         self.id = row_key.to_string();
///     }
/// }
///
/// assert!(Customer::field("Visits").is_some());
/// ```
pub trait TableModel: Default + Send + Sync + 'static {
    /// The descriptor table, excluding the two keys.
    fn fields() -> &'static [Field<Self>];

    fn partition_key(&self) -> &str;

    fn row_key(&self) -> &str;

    /// Assigns both keys after projection from a row.
    fn set_keys(&mut self, partition_key: &str, row_key: &str);

    /// Looks up a field descriptor by property name.
    fn field(name: &str) -> Option<&'static Field<Self>> {
        Self::fields().iter().find(|f| f.name() == name)
    }
}
