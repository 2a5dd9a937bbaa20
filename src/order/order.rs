use serde::{Deserialize, Serialize};

use crate::repository::Identified;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub product_ids: Vec<String>,
}

impl Order {
    pub fn new(
        id: impl Into<String>,
        customer_id: impl Into<String>,
        product_ids: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: id.into(),
            customer_id: customer_id.into(),
            product_ids: product_ids.into_iter().map(Into::into).collect(),
        }
    }
}

impl Identified for Order {
    fn id(&self) -> &str {
        &self.id
    }
}
