//! Field names are camelCase in documents and snake_case in PostgreSQL columns.

/// `max_group_size` -> `maxGroupSize`.
pub fn to_camel_case(column: &str) -> String {
    column
        .split('_')
        .enumerate()
        .map(|(i, part)| if i == 0 { part.to_string() } else { capitalize(part) })
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `ratingsAverage` -> `ratings_average`.
pub fn to_snake_case(field: &str) -> String {
    let mut column = String::with_capacity(field.len() + 4);
    for c in field.chars() {
        if c.is_uppercase() && !column.is_empty() {
            column.push('_');
        }
        column.extend(c.to_lowercase());
    }
    column
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tour_fields_map_to_columns_and_back() {
        assert_eq!(to_snake_case("startLocation"), "start_location");
        assert_eq!(to_snake_case("maxGroupSize"), "max_group_size");
        assert_eq!(to_camel_case("image_cover"), "imageCover");
        for name in ["maxGroupSize", "ratingsAverage", "secretTour", "price", "id"] {
            assert_eq!(to_camel_case(&to_snake_case(name)), name);
        }
    }
}
