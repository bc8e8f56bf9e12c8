//! Newtype ids for directory and identity rows.
//!
//! Every table uses a `SERIAL` primary key, so ids are `i32` on the wire and
//! in Postgres. Ids are ordered: a higher id was inserted later, which is what
//! "latest name" and "latest full name" rely on.

/// Define a type-safe id wrapper around `i32`.
///
/// The generated type is `Copy`, ordered, transparent in serde, displays as
/// the bare number and (with the `postgres` feature) binds and decodes as
/// `INT4`.
///
/// ```rust
/// # use gazetteer_core::define_id;
/// define_id!(ShelfId);
/// define_id!(BinId);
///
/// let shelf = ShelfId::new(3);
/// assert_eq!(shelf.as_i32(), 3);
/// // let _: BinId = shelf; // does not compile
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Wrap a raw row id.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// The raw row id.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value).map(Self)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

// Directory
define_id!(AddressId);
define_id!(NameId);
define_id!(FullNameId);
define_id!(ItemId);

// Identity
define_id!(UserId);
define_id!(RoleId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_order_by_insertion() {
        let mut ids = vec![FullNameId::new(7), FullNameId::new(2), FullNameId::new(5)];
        ids.sort();
        assert_eq!(ids.last().copied(), Some(FullNameId::new(7)));
    }

    #[test]
    fn test_id_serializes_as_bare_number() {
        let json = serde_json::to_string(&AddressId::new(42)).unwrap_or_default();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_id_display() {
        assert_eq!(ItemId::from(9).to_string(), "9");
        assert_eq!(i32::from(RoleId::new(4)), 4);
    }
}
