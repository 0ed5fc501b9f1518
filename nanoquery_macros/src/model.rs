use std::collections::HashSet;
use proc_macro2::TokenStream;
use syn::Error;
use syn::{DeriveInput, Data, Fields, FieldsNamed, Ident};
use syn::ext::IdentExt;
use quote::{format_ident, quote};
use crate::util::{ContainerAttributes, FieldAttributes};


pub fn expand(ts: TokenStream) -> Result<TokenStream, Error> {
    let input: DeriveInput = syn::parse2(ts)?;
    let attrs: ContainerAttributes = deluxe::parse_attributes(&input)?;
    let fields = named_fields(&input, "Model")?;

    expand_struct(&input, attrs, fields)
}

/// Ensures that the input is a non-generic struct with named fields.
pub fn named_fields<'a>(input: &'a DeriveInput, derive: &str) -> Result<&'a FieldsNamed, Error> {
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            format_args!("#[derive({derive})] is not supported for generic types")
        ));
    }

    match &input.data {
        Data::Struct(data) => {
            match &data.fields {
                Fields::Named(fields) => Ok(fields),
                Fields::Unnamed(_) => {
                    Err(Error::new_spanned(
                        input,
                        format_args!("#[derive({derive})] is not supported for tuple structs")
                    ))
                }
                Fields::Unit => {
                    Err(Error::new_spanned(
                        input,
                        format_args!("#[derive({derive})] is not supported for unit structs")
                    ))
                }
            }
        }
        Data::Enum(_) => {
            Err(Error::new_spanned(input, format_args!("#[derive({derive})] is not supported for enums")))
        }
        Data::Union(_) => {
            Err(Error::new_spanned(input, format_args!("#[derive({derive})] is not supported for unions")))
        }
    }
}

/// A mapped (i.e., not ignored) field, along with its attributes and column name.
pub struct MappedField<'a> {
    pub ident: &'a Ident,
    pub field: &'a syn::Field,
    pub attrs: FieldAttributes,
    pub column: String,
}

/// Parses the attributes of every field and computes the column names.
/// Ignored fields are left out.
pub fn mapped_fields<'a>(
    attrs: &ContainerAttributes,
    fields: &'a FieldsNamed,
) -> Result<Vec<MappedField<'a>>, Error> {
    let mut mapped = Vec::with_capacity(fields.named.len());

    for field in &fields.named {
        let field_attrs: FieldAttributes = deluxe::parse_attributes(field)?;

        if field_attrs.ignore {
            continue;
        }

        let ident = field.ident.as_ref().ok_or_else(|| {
            Error::new_spanned(field, "named field has no name")
        })?;
        let column = field_attrs.rename
            .as_ref()
            .map_or_else(
                || attrs.rename_all.display(ident.unraw()).to_string(),
                <_>::to_string,
            );

        mapped.push(MappedField {
            ident,
            field,
            attrs: field_attrs,
            column,
        });
    }

    validate_columns(&mapped)?;

    Ok(mapped)
}

fn validate_columns(fields: &[MappedField<'_>]) -> Result<(), Error> {
    // ensure that at most one field is marked as the PK
    let mut pk_iter = fields.iter().filter(|f| f.attrs.is_primary_key());
    pk_iter.next();

    if let Some(dup_pk) = pk_iter.next() {
        return Err(Error::new_spanned(dup_pk.field, "more than one primary key field"));
    }

    // a reference is navigated through, so it cannot identify the row
    if let Some(field) = fields.iter().find(|f| f.attrs.is_primary_key() && f.attrs.reference.is_some()) {
        return Err(Error::new_spanned(field.field, "a reference cannot be the primary key"));
    }

    // ensure that column names are unique
    let mut column_set = HashSet::new();

    for field in fields {
        if !column_set.insert(field.column.as_str()) {
            return Err(Error::new_spanned(
                field.field,
                format_args!("duplicate column name `{}`", field.column)
            ));
        }
    }

    Ok(())
}

fn expand_struct(
    input: &DeriveInput,
    attrs: ContainerAttributes,
    fields: &FieldsNamed,
) -> Result<TokenStream, Error> {
    let vis = &input.vis;
    let ty_name = &input.ident;
    let fields_ty_name = format_ident!("{}Fields", ty_name.unraw());
    let type_name_str = ty_name.unraw().to_string();
    let table_name = attrs.rename
        .as_ref()
        .map_or_else(|| type_name_str.clone(), <_>::to_string);
    let alias = attrs.alias.as_ref().map(|alias| quote!(.alias(#alias)));

    let mapped = mapped_fields(&attrs, fields)?;
    let fields_doc = format!("Typed column accessors of [`{type_name_str}`].");

    let accessor_names: Vec<_> = mapped.iter().map(|f| f.ident).collect();
    let property_names: Vec<_> = mapped.iter().map(|f| f.ident.unraw().to_string()).collect();

    let accessor_types = mapped.iter().map(|f| match &f.attrs.reference {
        Some(model) => quote!(<#model as ::nanoquery::Model>::Fields<R>),
        None => quote!(::nanoquery::Field<R>),
    });

    let accessor_values = mapped.iter().zip(&property_names).map(|(f, property)| {
        match &f.attrs.reference {
            Some(model) => quote!{
                <#model as ::nanoquery::Model>::fields_at(path.child(#property))
            },
            None => quote!{
                ::nanoquery::Field::new(path.child(#property))
            },
        }
    });

    let columns = mapped.iter().zip(&property_names).map(|(f, property)| {
        let column = &f.column;
        let field_ty = &f.field.ty;

        let kind_or_reference = match &f.attrs.reference {
            Some(model) => quote!(.references(<#model as ::nanoquery::Model>::description)),
            None => quote!(.kind(<#field_ty as ::nanoquery::ScalarType>::KIND)),
        };

        let primary_key = if *f.attrs.auto_increment {
            Some(quote!(.primary_key(::nanoquery::PrimaryKeyKind::AutoIncrement)))
        } else if *f.attrs.primary_key {
            Some(quote!(.primary_key(::nanoquery::PrimaryKeyKind::Assigned)))
        } else {
            None
        };

        quote!{
            .column(
                ::nanoquery::ColumnDesc::new(#property, #column)
                    #kind_or_reference
                    #primary_key
            )
        }
    });

    Ok(quote!{
        #[doc = #fields_doc]
        #[allow(missing_docs, missing_debug_implementations)]
        #vis struct #fields_ty_name<R> {
            #(pub #accessor_names: #accessor_types,)*
            #[doc(hidden)]
            pub __marker: ::core::marker::PhantomData<fn() -> R>,
        }

        impl ::nanoquery::Model for #ty_name {
            type Fields<R> = #fields_ty_name<R>;

            fn description() -> ::nanoquery::ModelDesc {
                ::nanoquery::ModelDesc::new(#type_name_str)
                    .table(#table_name)
                    #alias
                    #(#columns)*
            }

            #[allow(unused_variables)]
            fn fields_at<R>(path: ::nanoquery::PropertyPath) -> Self::Fields<R> {
                #fields_ty_name {
                    #(#accessor_names: #accessor_values,)*
                    __marker: ::core::marker::PhantomData,
                }
            }
        }
    })
}
