#[allow(unused_imports)]
use super::*;

mod entity;
mod field;

pub(crate) use entity::ParsedEntity;
use field::{BelongsTo, ParsedField};

fn optional_string_tokens(value: &Option<String>) -> TokenStream2 {
    match value {
        Some(v) => {
            let lit = LitStr::new(v, Span::call_site());
            quote! { Some(#lit.to_string()) }
        }
        None => quote! { None },
    }
}

fn string_lit(value: &str) -> LitStr {
    LitStr::new(value, Span::call_site())
}

/// Case conventions accepted by `rename_all`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum RenameRule {
    None,
    PascalCase,
    CamelCase,
}

impl RenameRule {
    fn parse(lit: &LitStr) -> Result<Self> {
        match lit.value().as_str() {
            "PascalCase" => Ok(RenameRule::PascalCase),
            "camelCase" => Ok(RenameRule::CamelCase),
            "snake_case" => Ok(RenameRule::None),
            other => Err(Error::new(
                lit.span(),
                format!("unknown rename_all rule `{other}`, expected `PascalCase`, `camelCase` or `snake_case`"),
            )),
        }
    }

    fn apply(self, field_name: &str) -> String {
        if self == RenameRule::None {
            return field_name.to_string();
        }
        let mut result = String::new();
        let mut upper_next = self == RenameRule::PascalCase;
        for ch in field_name.chars() {
            if ch == '_' {
                upper_next = !result.is_empty();
            } else if upper_next {
                result.extend(ch.to_uppercase());
                upper_next = false;
            } else {
                result.push(ch);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_rules() {
        assert_eq!(RenameRule::PascalCase.apply("customer_id"), "CustomerId");
        assert_eq!(RenameRule::CamelCase.apply("customer_id"), "customerId");
        assert_eq!(RenameRule::None.apply("customer_id"), "customer_id");
        assert_eq!(RenameRule::PascalCase.apply("id"), "Id");
    }
}
