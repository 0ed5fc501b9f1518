use core::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use proc_macro::TokenStream as TokenStream;
use proc_macro2::{TokenStream as TokenStream2, Span, Ident};
use syn::{Type, LitStr};
use syn::parse::{Parse, ParseStream, Error};
use syn::ext::IdentExt;
use quote::ToTokens;
use deluxe::{ParseAttributes, ParseMetaItem, SpannedValue};


pub fn expand<F>(ts: TokenStream, f: F) -> TokenStream
where
    F: FnOnce(TokenStream2) -> Result<TokenStream2, Error>
{
    f(ts.into()).unwrap_or_else(Error::into_compile_error).into()
}

/// Top-level attributes on a struct definition.
#[derive(Clone, Debug, ParseAttributes)]
#[deluxe(attributes(nanoquery))]
pub struct ContainerAttributes {
    /// The name of the table, if it differs from the name of the type.
    #[deluxe(alias = table)]
    pub rename: Option<IdentOrStr>,
    /// Rename all columns according to the specified case conversion.
    #[deluxe(default, with = deluxe::with::syn)]
    pub rename_all: CaseConversion,
    /// The alias proposed for the table in queries, instead of the
    /// first three characters of the type name.
    pub alias: Option<IdentOrStr>,
}

/// Attributes on a struct field.
#[derive(Clone, Debug, ParseAttributes)]
#[deluxe(attributes(nanoquery))]
pub struct FieldAttributes {
    /// Map the field to the column with the given name, instead of the
    /// (case-converted) field name.
    pub rename: Option<IdentOrStr>,
    /// Marks the field as the primary key.
    #[deluxe(alias = pk, default = SpannedValue::new(false))]
    pub primary_key: SpannedValue<bool>,
    /// Marks the primary key as generated by the database. Implies `pk`.
    #[deluxe(default = SpannedValue::new(false))]
    pub auto_increment: SpannedValue<bool>,
    /// Marks the field as a navigable reference to another model, given
    /// as the value of the attribute. It is not stored as a column.
    pub reference: Option<Type>,
    /// Leaves the field unmapped.
    #[deluxe(default = false)]
    pub ignore: bool,
}

impl FieldAttributes {
    /// Whether the field is the primary key, either explicitly or implied
    /// by `auto_increment`.
    pub fn is_primary_key(&self) -> bool {
        *self.primary_key || *self.auto_increment
    }
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Debug)]
pub enum CaseConversion {
    #[default]
    Identity,
    LowerSnakeCase,
    UpperSnakeCase,
    LowerCamelCase,
    UpperCamelCase,
    LowerKebabCase,
    UpperKebabCase,
    TitleCase,
    TrainCase,
}

impl Parse for CaseConversion {
    fn parse(stream: ParseStream<'_>) -> Result<Self, Error> {
        let raw: IdentOrStr = stream.parse()?;

        Ok(match raw.to_string().as_str() {
            "identity" => CaseConversion::Identity,
            "lower_snake_case" => CaseConversion::LowerSnakeCase,
            "UPPER_SNAKE_CASE" => CaseConversion::UpperSnakeCase,
            "lowerCamelCase" => CaseConversion::LowerCamelCase,
            "UpperCamelCase" => CaseConversion::UpperCamelCase,
            "lower-kebab-case" => CaseConversion::LowerKebabCase,
            "UPPER-KEBAB-CASE" => CaseConversion::UpperKebabCase,
            "Title Case" => CaseConversion::TitleCase,
            "Train-Case" => CaseConversion::TrainCase,
            _ => return Err(Error::new_spanned(&raw, "invalid case conversion method")),
        })
    }
}

impl CaseConversion {
    pub fn display<T>(self, value: T) -> CaseConversionDisplay<T> {
        CaseConversionDisplay {
            value,
            conversion: self,
        }
    }
}

pub struct CaseConversionDisplay<T> {
    value: T,
    conversion: CaseConversion,
}

impl<T: Display> Display for CaseConversionDisplay<T> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        use heck::*;
        use CaseConversion::*;

        match self.conversion {
            Identity       => self.value.fmt(formatter),
            LowerSnakeCase => AsSnakeCase(self.value.to_string()).fmt(formatter),
            UpperSnakeCase => AsShoutySnakeCase(self.value.to_string()).fmt(formatter),
            LowerCamelCase => AsLowerCamelCase(self.value.to_string()).fmt(formatter),
            UpperCamelCase => AsUpperCamelCase(self.value.to_string()).fmt(formatter),
            LowerKebabCase => AsKebabCase(self.value.to_string()).fmt(formatter),
            UpperKebabCase => AsShoutyKebabCase(self.value.to_string()).fmt(formatter),
            TitleCase      => AsTitleCase(self.value.to_string()).fmt(formatter),
            TrainCase      => AsTrainCase(self.value.to_string()).fmt(formatter),
        }
    }
}

/// A generic helper for parsing a string from either a string literal or an identifier.
#[derive(Clone, Eq, Debug)]
pub enum IdentOrStr {
    Ident(Ident),
    Str(LitStr),
}

impl IdentOrStr {
    fn validate_ident(ident: &str, span: Span) -> Result<(), Error> {
        let mut chars = ident.chars();
        let Some(first) = chars.next() else {
            return Err(Error::new(span, "identifier must not be empty"));
        };
        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(
                Error::new(span, format_args!("invalid leading character `{first}` in identifier"))
            );
        }
        if let Some(bad) = chars.find(|&c| !c.is_ascii_alphanumeric() && c != '_') {
            return Err(
                Error::new(span, format_args!("invalid character `{bad}` in identifier"))
            );
        }
        Ok(())
    }
}

impl Parse for IdentOrStr {
    fn parse(stream: ParseStream<'_>) -> Result<Self, Error> {
        let lookahead = stream.lookahead1();

        if lookahead.peek(Ident::peek_any) {
            Ident::parse_any(stream).and_then(|ident| {
                let ident = ident.unraw();
                Self::validate_ident(&ident.to_string(), ident.span())?;
                Ok(IdentOrStr::Ident(ident))
            })
        } else if lookahead.peek(LitStr) {
            stream.parse::<LitStr>().and_then(|lit| {
                Self::validate_ident(&lit.value(), lit.span())?;
                Ok(IdentOrStr::Str(lit))
            })
        } else {
            Err(lookahead.error())
        }
    }
}

impl ParseMetaItem for IdentOrStr {
    fn parse_meta_item(stream: ParseStream<'_>, _: deluxe::ParseMode) -> Result<Self, Error> {
        <IdentOrStr as Parse>::parse(stream)
    }
}

impl ToTokens for IdentOrStr {
    fn to_tokens(&self, tokens: &mut TokenStream2) {
        match self {
            IdentOrStr::Ident(ident) => {
                let lit = LitStr::new(&ident.to_string(), ident.span());
                lit.to_tokens(tokens);
            }
            IdentOrStr::Str(lit) => lit.to_tokens(tokens)
        }
    }
}

impl Display for IdentOrStr {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            IdentOrStr::Ident(ident) => Display::fmt(ident, formatter),
            IdentOrStr::Str(lit) => Display::fmt(&lit.value(), formatter),
        }
    }
}

impl PartialEq for IdentOrStr {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Hash for IdentOrStr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}
