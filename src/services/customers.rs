use crate::{
    db::{self, DbPool},
    entities::{
        customer::{self, Entity as Customer},
        quotation,
    },
    errors::ServiceError,
};
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Customer form. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CustomerInput {
    #[serde(default)]
    #[validate(length(max = 255, message = "Máximo 255 caracteres"))]
    pub nombre_empresa: Option<String>,
    #[serde(default)]
    #[validate(length(max = 255, message = "Máximo 255 caracteres"))]
    pub contacto_nombre: Option<String>,
    #[serde(default)]
    #[validate(email(message = "Correo electrónico inválido"))]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(max = 50, message = "Máximo 50 caracteres"))]
    pub telefono: Option<String>,
    /// Tax id
    #[serde(default)]
    #[validate(length(max = 20, message = "Máximo 20 caracteres"))]
    pub rfc: Option<String>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl CustomerInput {
    pub fn normalized(self) -> Self {
        Self {
            nombre_empresa: clean(self.nombre_empresa),
            contacto_nombre: clean(self.contacto_nombre),
            email: clean(self.email),
            telefono: clean(self.telefono),
            rfc: clean(self.rfc),
        }
    }

    fn apply(self, model: &mut customer::ActiveModel) {
        model.nombre_empresa = Set(self.nombre_empresa);
        model.contacto_nombre = Set(self.contacto_nombre);
        model.email = Set(self.email);
        model.telefono = Set(self.telefono);
        model.rfc = Set(self.rfc);
    }
}

/// Service for managing customers
#[derive(Clone)]
pub struct CustomerService {
    db_pool: Arc<DbPool>,
}

impl CustomerService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: CustomerInput) -> Result<customer::Model, ServiceError> {
        let input = input.normalized();
        input.validate()?;

        let txn = db::begin(&self.db_pool).await?;
        let mut model = <customer::ActiveModel as Default>::default();
        input.apply(&mut model);
        let created = model.insert(&txn).await.map_err(|e| {
            error!(error = %e, "Failed to create customer");
            ServiceError::DatabaseError(e)
        })?;
        db::commit(txn).await?;

        info!(customer_id = created.customer_id, "Customer created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, customer_id: i32) -> Result<customer::Model, ServiceError> {
        Customer::find_by_id(customer_id)
            .one(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(customer_id, error = %e, "Database error when fetching customer");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| not_found(customer_id))
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        customer_id: i32,
        input: CustomerInput,
    ) -> Result<customer::Model, ServiceError> {
        let input = input.normalized();
        input.validate()?;

        let txn = db::begin(&self.db_pool).await?;
        let existing = Customer::find_by_id(customer_id)
            .one(&txn)
            .await?
            .ok_or_else(|| not_found(customer_id))?;

        let mut model: customer::ActiveModel = existing.into();
        input.apply(&mut model);
        let updated = model.update(&txn).await?;
        db::commit(txn).await?;

        info!(customer_id, "Customer updated");
        Ok(updated)
    }

    /// Hard delete, refused while quotations belong to the customer.
    #[instrument(skip(self))]
    pub async fn delete(&self, customer_id: i32) -> Result<(), ServiceError> {
        let txn = db::begin(&self.db_pool).await?;

        let existing = Customer::find_by_id(customer_id)
            .one(&txn)
            .await?
            .ok_or_else(|| not_found(customer_id))?;

        let quotations = quotation::Entity::find()
            .filter(quotation::Column::CustomerId.eq(customer_id))
            .count(&txn)
            .await?;
        if quotations > 0 {
            warn!(customer_id, quotations, "Delete blocked by quotations");
            return Err(ServiceError::Conflict(format!(
                "{} tiene {} cotización(es)",
                existing.display_name(),
                quotations
            )));
        }

        Customer::delete_by_id(customer_id)
            .exec(&txn)
            .await
            .map_err(|e| ServiceError::from_db(e, "El cliente"))?;
        db::commit(txn).await?;

        info!(customer_id, "Customer deleted");
        Ok(())
    }

    /// Case-insensitive match on company, contact, email or tax id, ordered by company name.
    #[instrument(skip(self))]
    pub async fn search(&self, text: Option<&str>) -> Result<Vec<customer::Model>, ServiceError> {
        let mut query = Customer::find();

        if let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", text.to_lowercase());
            let mut any = Condition::any();
            for column in [
                customer::Column::NombreEmpresa,
                customer::Column::ContactoNombre,
                customer::Column::Email,
                customer::Column::Rfc,
            ] {
                any = any.add(Expr::expr(Func::lower(Expr::col(column))).like(pattern.as_str()));
            }
            query = query.filter(any);
        }

        query
            .order_by_asc(customer::Column::NombreEmpresa)
            .order_by_asc(customer::Column::CustomerId)
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Database error when searching customers");
                ServiceError::DatabaseError(e)
            })
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        Ok(Customer::find().count(&*self.db_pool).await?)
    }
}

fn not_found(customer_id: i32) -> ServiceError {
    ServiceError::NotFound(format!("Cliente {} no encontrado", customer_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_become_absent() {
        let input = CustomerInput {
            nombre_empresa: Some("  Acme ".into()),
            email: Some("".into()),
            ..Default::default()
        }
        .normalized();
        assert_eq!(input.nombre_empresa.as_deref(), Some("Acme"));
        assert_eq!(input.email, None);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn malformed_email_is_rejected() {
        let input = CustomerInput {
            email: Some("no-at-sign".into()),
            ..Default::default()
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }
}
