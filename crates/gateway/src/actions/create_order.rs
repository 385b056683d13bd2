use oficina_storage::{
    ClientRecord, NewClient, NewProcedure, NewServiceOrder, NewVehicle, OrderStatus,
    ProcedureStatus, WorkshopStorage,
};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{ActionError, ClientInput, CreateOrderInput};

/// Label stored when neither explicit nor derived brand/model is available.
pub const UNKNOWN_LABEL: &str = "Não informado";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedOrder {
    #[serde(rename = "ordem_servico_id")]
    pub order_id: String,
    #[serde(rename = "numero_os")]
    pub number: i64,
    #[serde(rename = "cliente_id")]
    pub client_id: String,
    #[serde(rename = "veiculo_id")]
    pub vehicle_id: Option<String>,
    pub status: OrderStatus,
}

pub(super) async fn run(
    storage: &dyn WorkshopStorage,
    input: &CreateOrderInput,
) -> Result<CreatedOrder, ActionError> {
    let client = resolve_client(storage, &input.client).await?;

    let vehicle_id = match &input.client.plate {
        Some(plate) => Some(resolve_vehicle(storage, &client, &input.client, plate).await?),
        None => None,
    };

    let value = input.procedure.value.unwrap_or(Decimal::ZERO);
    let order = storage
        .insert_order(NewServiceOrder {
            client_id: client.id.clone(),
            vehicle_id: vehicle_id.clone(),
            description: input.procedure.description.clone(),
            notes: input.procedure.notes.clone(),
            total_value: value,
            status: OrderStatus::Pending,
        })
        .await?;

    storage
        .insert_procedure(NewProcedure {
            order_id: order.id.clone(),
            description: input.procedure.description.clone(),
            value,
            status: ProcedureStatus::Pending,
        })
        .await?;

    tracing::info!(numero_os = order.number, cliente_id = %client.id, "service order created");

    Ok(CreatedOrder {
        order_id: order.id,
        number: order.number,
        client_id: client.id,
        vehicle_id,
        status: order.status,
    })
}

async fn resolve_client(
    storage: &dyn WorkshopStorage,
    input: &ClientInput,
) -> Result<ClientRecord, ActionError> {
    if let Some(existing) = storage.find_client_by_phone(&input.phone).await? {
        return Ok(existing);
    }
    let created = storage
        .insert_client(NewClient {
            name: input.name.clone(),
            phone: input.phone.clone(),
            email: input.email.clone(),
            document: input.document.clone(),
        })
        .await?;
    Ok(created)
}

async fn resolve_vehicle(
    storage: &dyn WorkshopStorage,
    client: &ClientRecord,
    input: &ClientInput,
    plate: &str,
) -> Result<String, ActionError> {
    if let Some(existing) = storage.find_vehicle_by_plate(plate).await? {
        return Ok(existing.id);
    }
    let (brand, model) = brand_and_model(input);
    let created = storage
        .insert_vehicle(NewVehicle {
            client_id: client.id.clone(),
            brand,
            model,
            plate: plate.to_string(),
            year: input.year,
            color: input.color.clone(),
        })
        .await?;
    Ok(created.id)
}

/// Explicit fields win; otherwise split the free-text `carro` on its first
/// space into brand and model.
fn brand_and_model(input: &ClientInput) -> (String, String) {
    let (car_brand, car_model) = match input.car.as_deref().map(str::trim) {
        Some(car) => match car.split_once(' ') {
            Some((first, rest)) => (first, rest.trim()),
            None => (car, ""),
        },
        None => ("", ""),
    };

    let pick = |explicit: &Option<String>, derived: &str| -> String {
        explicit
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(Some(derived).filter(|s| !s.is_empty()))
            .unwrap_or(UNKNOWN_LABEL)
            .to_string()
    };

    (pick(&input.brand, car_brand), pick(&input.model, car_model))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(car: Option<&str>, brand: Option<&str>, model: Option<&str>) -> ClientInput {
        ClientInput {
            name: "João Silva".to_string(),
            phone: "11999999999".to_string(),
            email: None,
            document: None,
            car: car.map(String::from),
            plate: Some("ABC1D23".to_string()),
            brand: brand.map(String::from),
            model: model.map(String::from),
            year: None,
            color: None,
        }
    }

    #[test]
    fn car_text_splits_on_first_space() {
        let (brand, model) = brand_and_model(&client(Some("Fiat Uno Mille"), None, None));
        assert_eq!(brand, "Fiat");
        assert_eq!(model, "Uno Mille");
    }

    #[test]
    fn explicit_fields_override_car_text() {
        let (brand, model) =
            brand_and_model(&client(Some("Fiat Uno"), Some("Volkswagen"), None));
        assert_eq!(brand, "Volkswagen");
        assert_eq!(model, "Uno");
    }

    #[test]
    fn single_word_car_leaves_model_unknown() {
        let (brand, model) = brand_and_model(&client(Some("Gol"), None, None));
        assert_eq!(brand, "Gol");
        assert_eq!(model, UNKNOWN_LABEL);
    }

    #[test]
    fn nothing_supplied_falls_back_to_label() {
        let (brand, model) = brand_and_model(&client(None, None, None));
        assert_eq!(brand, UNKNOWN_LABEL);
        assert_eq!(model, UNKNOWN_LABEL);
    }
}
