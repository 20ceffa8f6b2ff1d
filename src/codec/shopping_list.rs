use potion::HtmlError;

use crate::{
    constants::SHOPPING_CART_HEADER,
    schema::CartTotal,
};

/// One line per ingredient: `"<name> (<unit>)",<total>`.
pub fn render_shopping_list(totals: &[CartTotal]) -> Result<Vec<u8>, potion::Error> {
    let mut writer = csv::Writer::from_writer(vec![]);

    writer
        .write_record(SHOPPING_CART_HEADER)
        .map_err(csv_error)?;

    for total in totals {
        writer
            .write_record([
                format!("{} ({})", total.name, total.measurement_unit),
                total.total.to_string(),
            ])
            .map_err(csv_error)?;
    }

    writer.into_inner().map_err(|e| {
        log::error!("Failed to flush shopping list: {e}");
        HtmlError::InternalServerError.new("Failed to render shopping list")
    })
}

fn csv_error(e: csv::Error) -> potion::Error {
    log::error!("Failed to write shopping list: {e}");
    HtmlError::InternalServerError.new("Failed to render shopping list")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(name: &str, unit: &str, total: i64) -> CartTotal {
        CartTotal {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            total,
        }
    }

    #[test]
    fn renders_header_and_rows() {
        let totals = vec![total("flour", "g", 750), total("milk", "ml", 200)];
        let Ok(bytes) = render_shopping_list(&totals) else {
            panic!("render failed");
        };

        assert_eq!(
            String::from_utf8_lossy(&bytes),
            "Ingredient,Amount\nflour (g),750\nmilk (ml),200\n"
        );
    }

    #[test]
    fn quotes_names_with_commas() {
        let totals = vec![total("salt, coarse", "g", 5)];
        let Ok(bytes) = render_shopping_list(&totals) else {
            panic!("render failed");
        };

        assert_eq!(
            String::from_utf8_lossy(&bytes),
            "Ingredient,Amount\n\"salt, coarse (g)\",5\n"
        );
    }

    #[test]
    fn empty_cart_is_header_only() {
        let Ok(bytes) = render_shopping_list(&[]) else {
            panic!("render failed");
        };

        assert_eq!(String::from_utf8_lossy(&bytes), "Ingredient,Amount\n");
    }
}
