//! Demo catalogue loaded at startup when `SEED_DATA=true`

use std::collections::HashMap;

use domain_productos::{
    Categoria, MongoCategoriaRepository, MongoProductoRepository, Producto, ProductoResult,
    ProductoService,
};
use mongodb::Database;
use tracing::info;

const CATEGORIAS: [&str; 4] = ["Electrónico", "Deporte", "Computación", "Muebles"];

const PRODUCTOS: [(&str, f64, &str); 9] = [
    ("TV Panasonic Pantalla LCD", 456.89, "Electrónico"),
    ("Sony Camara HD Digital", 177.89, "Electrónico"),
    ("Apple iPod", 46.89, "Electrónico"),
    ("Sony Notebook", 846.89, "Computación"),
    ("Hewlett Packard Multifuncional", 200.89, "Computación"),
    ("Bianchi Bicicleta", 70.89, "Deporte"),
    ("HP Notebook Omen 17", 2500.89, "Computación"),
    ("Mica Cómoda 5 Cajones", 150.89, "Muebles"),
    ("TV Sony Bravia OLED 4K Ultra HD", 2255.89, "Electrónico"),
];

/// Drop both collections and insert the demo categories and products.
pub async fn run(db: &Database) -> ProductoResult<()> {
    let productos = MongoProductoRepository::new(db);
    let categorias = MongoCategoriaRepository::new(db);

    productos.drop_all().await?;
    categorias.drop_all().await?;

    let service = ProductoService::new(productos, categorias);

    let mut saved = HashMap::new();
    for nombre in CATEGORIAS {
        let categoria = service.save_categoria(Categoria::new(nombre)).await?;
        info!(id = ?categoria.id, nombre = %categoria.nombre, "Categoria seeded");
        saved.insert(nombre, categoria);
    }

    for producto in catalogue(&saved) {
        let producto = service.save(producto).await?;
        info!(id = ?producto.id, nombre = %producto.nombre, "Producto seeded");
    }

    Ok(())
}

/// Products stamped with the current time, each linked to its saved category
fn catalogue(categorias: &HashMap<&str, Categoria>) -> Vec<Producto> {
    PRODUCTOS
        .iter()
        .map(|&(nombre, precio, categoria)| {
            let mut producto = Producto::new(nombre, precio, categorias.get(categoria).cloned());
            producto.stamp_create_at();
            producto
        })
        .collect()
}
