use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{ProductoError, ProductoResult, field_messages};

pub const MENSAJE_CREADO: &str = "Producto creado con éxito!";

/// Product category, embedded by value in each [`Producto`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Categoria {
    /// Assigned by the store on first save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub nombre: String,
}

impl Categoria {
    pub fn new(nombre: impl Into<String>) -> Self {
        Self {
            id: None,
            nombre: nombre.into(),
        }
    }
}

/// Product record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Producto {
    /// Assigned by the store on first save, never changed afterwards
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub nombre: String,
    pub precio: f64,
    /// Creation time, millisecond precision
    #[serde(rename = "createAt", default)]
    pub create_at: Option<DateTime<Utc>>,
    /// `<uuid>-<sanitized original name>` once a photo has been uploaded
    #[serde(default)]
    pub foto: Option<String>,
    #[serde(default)]
    pub categoria: Option<Categoria>,
}

impl Producto {
    pub fn new(nombre: impl Into<String>, precio: f64, categoria: Option<Categoria>) -> Self {
        Self {
            id: None,
            nombre: nombre.into(),
            precio,
            create_at: None,
            foto: None,
            categoria,
        }
    }

    /// Set `create_at` to now unless the client supplied one.
    pub fn stamp_create_at(&mut self) {
        if self.create_at.is_none() {
            self.create_at = Some(now_millis());
        }
    }

    /// Copy the editable fields from an edit body, unvalidated.
    ///
    /// `categoria` is taken as sent, so leaving it out clears it. An absent
    /// `nombre` or `precio` keeps the stored value. Id, creation time and
    /// photo never change here.
    pub fn apply_edit(&mut self, changes: ProductoPayload) {
        if let Some(nombre) = changes.nombre {
            self.nombre = nombre;
        }
        if let Some(precio) = changes.precio {
            self.precio = precio;
        }
        self.categoria = changes.categoria;
    }

    pub fn with_nombre_upper_case(mut self) -> Self {
        self.nombre = self.nombre.to_uppercase();
        self
    }
}

/// Current time truncated to what MongoDB stores.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// JSON body for create and edit
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct ProductoPayload {
    #[validate(
        required(message = "no puede estar vacío"),
        length(min = 1, message = "no puede estar vacío")
    )]
    pub nombre: Option<String>,

    #[validate(required(message = "no puede ser nulo"))]
    pub precio: Option<f64>,

    #[serde(rename = "createAt", default)]
    pub create_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub categoria: Option<Categoria>,
}

impl ProductoPayload {
    /// Validate and build the record. Id and photo are never taken from a payload.
    pub fn into_producto(self) -> ProductoResult<Producto> {
        self.validate()?;
        Ok(self.build())
    }

    fn build(self) -> Producto {
        Producto {
            id: None,
            nombre: self.nombre.unwrap_or_default(),
            precio: self.precio.unwrap_or_default(),
            create_at: self.create_at,
            foto: None,
            categoria: self.categoria,
        }
    }
}

/// Text fields of the create-with-photo multipart form, as received
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductoForm {
    pub nombre: Option<String>,
    pub precio: Option<String>,
    pub create_at: Option<String>,
    pub categoria_id: Option<String>,
    pub categoria_nombre: Option<String>,
}

impl ProductoForm {
    /// Store a text part. Returns `false` for names this form does not know.
    pub fn set(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "nombre" => &mut self.nombre,
            "precio" => &mut self.precio,
            "createAt" => &mut self.create_at,
            "categoria.id" => &mut self.categoria_id,
            "categoria.nombre" => &mut self.categoria_nombre,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// Parse the text fields into a payload, then validate it.
    ///
    /// Unparseable numbers and dates are reported as field errors alongside
    /// the payload's own validation errors.
    pub fn into_producto(self) -> ProductoResult<Producto> {
        let mut errors: Vec<(String, String)> = Vec::new();

        let precio = match non_blank(self.precio) {
            None => None,
            Some(raw) => match raw.parse::<f64>() {
                Ok(value) if value.is_finite() => Some(value),
                _ => {
                    errors.push((
                        "precio".into(),
                        "El campo precio no es un número válido".into(),
                    ));
                    None
                }
            },
        };

        let create_at = match non_blank(self.create_at) {
            None => None,
            Some(raw) => match parse_fecha(&raw) {
                Some(value) => Some(value),
                None => {
                    errors.push((
                        "createAt".into(),
                        "El campo createAt no es una fecha válida".into(),
                    ));
                    None
                }
            },
        };

        let categoria_id = non_blank(self.categoria_id);
        let categoria_nombre = non_blank(self.categoria_nombre);
        let categoria = if categoria_id.is_some() || categoria_nombre.is_some() {
            Some(Categoria {
                id: categoria_id,
                nombre: categoria_nombre.unwrap_or_default(),
            })
        } else {
            None
        };

        let payload = ProductoPayload {
            nombre: self.nombre,
            precio,
            create_at,
            categoria,
        };

        if let Err(validation) = payload.validate() {
            let already: Vec<&str> = errors.iter().map(|(field, _)| field.as_str()).collect();
            let more = field_messages(&validation, &already);
            errors.extend(more);
        }

        if errors.is_empty() {
            Ok(payload.build())
        } else {
            errors.sort();
            Err(ProductoError::Validation(
                errors.into_iter().map(|(_, message)| message).collect(),
            ))
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// RFC 3339, or a bare `yyyy-MM-dd` taken as midnight UTC
fn parse_fecha(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(value.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// 201 body for `POST /`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatedResponse {
    pub producto: Producto,
    pub mensaje: String,
    pub timestamp: DateTime<Utc>,
}

impl CreatedResponse {
    pub fn new(producto: Producto) -> Self {
        Self {
            producto,
            mensaje: MENSAJE_CREADO.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// 400 body listing every field error
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidationErrorBody {
    pub errors: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub status: u16,
}

impl ValidationErrorBody {
    pub fn new(errors: Vec<String>) -> Self {
        Self {
            errors,
            timestamp: Utc::now(),
            status: 400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn validation_messages(result: ProductoResult<Producto>) -> Vec<String> {
        match result {
            Err(ProductoError::Validation(messages)) => messages,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_payload_missing_nombre_yields_single_error() {
        let payload = ProductoPayload {
            precio: Some(10.0),
            ..Default::default()
        };

        assert_eq!(
            validation_messages(payload.into_producto()),
            vec!["El campo nombre no puede estar vacío"]
        );
    }

    #[test]
    fn test_payload_empty_nombre_and_missing_precio() {
        let payload = ProductoPayload {
            nombre: Some(String::new()),
            ..Default::default()
        };

        assert_eq!(
            validation_messages(payload.into_producto()),
            vec![
                "El campo nombre no puede estar vacío",
                "El campo precio no puede ser nulo",
            ]
        );
    }

    #[test]
    fn test_payload_deserializes_wire_names() {
        let payload: ProductoPayload = serde_json::from_str(
            r#"{"nombre":"Mesa comedor","precio":100.0,"createAt":"2024-03-01T10:00:00Z",
                "categoria":{"id":"c1","nombre":"Muebles"},"foto":"ignored.png","id":"ignored"}"#,
        )
        .unwrap();

        let producto = payload.into_producto().unwrap();
        assert_eq!(producto.id, None);
        assert_eq!(producto.foto, None);
        assert_eq!(producto.nombre, "Mesa comedor");
        assert_eq!(
            producto.create_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(producto.categoria.unwrap().nombre, "Muebles");
    }

    #[test]
    fn test_producto_serializes_create_at_camel_case() {
        let mut producto = Producto::new("Apple iPod", 46.89, None);
        producto.id = Some("abc".into());
        producto.stamp_create_at();

        let json = serde_json::to_value(&producto).unwrap();
        assert_eq!(json["id"], "abc");
        assert!(json["createAt"].is_string());
        assert!(json.get("create_at").is_none());
    }

    #[test]
    fn test_stamp_create_at_keeps_client_value() {
        let fixed = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let mut producto = Producto::new("Sony Notebook", 846.89, None);
        producto.create_at = Some(fixed);

        producto.stamp_create_at();
        assert_eq!(producto.create_at, Some(fixed));
    }

    #[test]
    fn test_apply_edit_preserves_identity() {
        let created = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let mut existing = Producto::new("Sony Notebook", 846.89, None);
        existing.id = Some("p1".into());
        existing.create_at = Some(created);
        existing.foto = Some("x-foto.png".into());

        existing.apply_edit(ProductoPayload {
            nombre: Some("Asus Notebook".into()),
            precio: Some(100.0),
            create_at: Some(Utc::now()),
            categoria: Some(Categoria::new("Electrónico")),
        });

        assert_eq!(existing.id.as_deref(), Some("p1"));
        assert_eq!(existing.create_at, Some(created));
        assert_eq!(existing.foto.as_deref(), Some("x-foto.png"));
        assert_eq!(existing.nombre, "Asus Notebook");
        assert_eq!(existing.precio, 100.0);
        assert_eq!(existing.categoria.unwrap().nombre, "Electrónico");
    }

    #[test]
    fn test_apply_edit_partial_body_keeps_missing_fields() {
        let mut existing = Producto::new(
            "Sony Notebook",
            846.89,
            Some(Categoria::new("Computación")),
        );

        existing.apply_edit(ProductoPayload {
            nombre: Some("Asus Notebook".into()),
            ..ProductoPayload::default()
        });

        assert_eq!(existing.nombre, "Asus Notebook");
        assert_eq!(existing.precio, 846.89);
        assert!(existing.categoria.is_none());
    }

    #[test]
    fn test_form_parses_fields() {
        let mut form = ProductoForm::default();
        assert!(form.set("nombre", "Bianchi Bicicleta".into()));
        assert!(form.set("precio", " 70.89 ".into()));
        assert!(form.set("createAt", "2023-12-24".into()));
        assert!(form.set("categoria.nombre", "Deporte".into()));
        assert!(!form.set("unknown", "x".into()));

        let producto = form.into_producto().unwrap();
        assert_eq!(producto.precio, 70.89);
        assert_eq!(
            producto.create_at,
            Some(Utc.with_ymd_and_hms(2023, 12, 24, 0, 0, 0).unwrap())
        );
        assert_eq!(producto.categoria, Some(Categoria::new("Deporte")));
    }

    #[test]
    fn test_form_bad_precio_reported_once() {
        let form = ProductoForm {
            nombre: Some("Mesa".into()),
            precio: Some("cien".into()),
            create_at: Some("ayer".into()),
            ..Default::default()
        };

        assert_eq!(
            validation_messages(form.into_producto()),
            vec![
                "El campo createAt no es una fecha válida",
                "El campo precio no es un número válido",
            ]
        );
    }

    #[test]
    fn test_form_missing_everything() {
        assert_eq!(
            validation_messages(ProductoForm::default().into_producto()),
            vec![
                "El campo nombre no puede estar vacío",
                "El campo precio no puede ser nulo",
            ]
        );
    }

    #[test]
    fn test_created_response_shape() {
        let body = CreatedResponse::new(Producto::new("Mesa comedor", 100.0, None));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["mensaje"], MENSAJE_CREADO);
        assert_eq!(json["producto"]["nombre"], "Mesa comedor");
        assert!(json["timestamp"].is_string());
    }
}
