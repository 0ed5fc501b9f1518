use proc_macro2::TokenStream;
use syn::Error;
use syn::DeriveInput;
use syn::ext::IdentExt;
use quote::quote;
use crate::model::{named_fields, mapped_fields};
use crate::util::ContainerAttributes;


pub fn expand(ts: TokenStream) -> Result<TokenStream, Error> {
    let input: DeriveInput = syn::parse2(ts)?;
    let attrs: ContainerAttributes = deluxe::parse_attributes(&input)?;
    let fields = named_fields(&input, "Record")?;
    let mapped = mapped_fields(&attrs, fields)?;

    let ty_name = &input.ident;
    let type_name_str = ty_name.unraw().to_string();

    // references are not stored, so they do not contribute values
    let stored_fields = mapped
        .iter()
        .filter(|f| f.attrs.reference.is_none())
        .map(|f| f.ident);

    let pk_field = mapped.iter().find(|f| f.attrs.is_primary_key());

    let key_body = match pk_field {
        Some(f) => {
            let ident = f.ident;
            quote!(::nanoquery::Scalar::to_storable(&self.#ident))
        }
        None => quote!{
            ::core::result::Result::Err(::nanoquery::Error::MissingPrimaryKey {
                model: ::std::string::String::from(#type_name_str),
            })
        },
    };

    let set_key_body = match pk_field {
        Some(f) if *f.attrs.auto_increment => {
            let ident = f.ident;
            quote!{
                self.#ident = ::nanoquery::FromKey::from_key(key)?;
                ::core::result::Result::Ok(())
            }
        }
        Some(f) => {
            let message = format!(
                "the primary key `{}` of `{}` is assigned by the caller, not generated",
                f.ident.unraw(),
                type_name_str,
            );
            quote!{
                let _ = key;
                ::core::result::Result::Err(::nanoquery::Error::message(#message))
            }
        }
        None => quote!{
            let _ = key;
            ::core::result::Result::Err(::nanoquery::Error::MissingPrimaryKey {
                model: ::std::string::String::from(#type_name_str),
            })
        },
    };

    Ok(quote!{
        impl ::nanoquery::Record for #ty_name {
            fn values(&self) -> ::nanoquery::Result<::std::vec::Vec<::nanoquery::Value>> {
                ::core::result::Result::Ok(::std::vec![
                    #(::nanoquery::Scalar::to_storable(&self.#stored_fields)?,)*
                ])
            }

            fn key(&self) -> ::nanoquery::Result<::nanoquery::Value> {
                #key_body
            }

            fn set_key(&mut self, key: ::core::primitive::i64) -> ::nanoquery::Result<()> {
                #set_key_body
            }
        }
    })
}
