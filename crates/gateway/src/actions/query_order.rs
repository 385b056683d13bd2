use oficina_storage::{OrderDetails, WorkshopStorage};

use super::{ActionError, QueryOrderInput};

pub(super) async fn run(
    storage: &dyn WorkshopStorage,
    input: &QueryOrderInput,
) -> Result<OrderDetails, ActionError> {
    storage
        .load_order_details(input.number)
        .await?
        .ok_or(ActionError::OrderNotFound(input.number))
}
