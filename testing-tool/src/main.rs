use colored::*;
use serde_json::{json, Value};
use std::io::{self, Write};

type ToolResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Sesión de la herramienta contra un servidor RiderGo
struct Session {
    http: reqwest::Client,
    base_url: String,
    client_token: Option<String>,
    rider_token: Option<String>,
}

#[tokio::main]
async fn main() -> ToolResult<()> {
    println!("{}", "🏍️ RiderGo Testing Tool".bright_blue().bold());
    println!("{}", "=======================".bright_blue());
    println!();

    let base_url = prompt("URL del servidor [http://localhost:5000]: ")?;
    let base_url = if base_url.is_empty() {
        "http://localhost:5000".to_string()
    } else {
        base_url.trim_end_matches('/').to_string()
    };

    let mut session = Session {
        http: reqwest::Client::new(),
        base_url,
        client_token: None,
        rider_token: None,
    };

    loop {
        println!();
        println!("{}", "📋 MENÚ PRINCIPAL".bright_green().bold());
        println!("{}", "==================".bright_green());
        println!("1. 💓 Health check");
        println!("2. 👤 Cliente: registro + OTP");
        println!("3. 📦 Cliente: crear entrega de prueba");
        println!("4. 👛 Cliente: cargar monedero y ver saldo");
        println!("5. 🔐 Rider: login");
        println!("6. 🔍 Rider: viajes disponibles");
        println!("7. ✅ Rider: aceptar viaje");
        println!("8. 🚪 Salir");
        let choice = prompt("Selecciona una opción (1-8): ")?;

        let outcome = match choice.as_str() {
            "1" => health(&session).await,
            "2" => client_login(&mut session).await,
            "3" => create_delivery(&session).await,
            "4" => wallet(&session).await,
            "5" => rider_login(&mut session).await,
            "6" => available_trips(&session).await,
            "7" => accept_trip(&session).await,
            "8" => {
                println!("{}", "👋 ¡Hasta luego!".bright_green());
                break;
            }
            _ => {
                println!("{}", "❌ Opción inválida. Intenta de nuevo.".bright_red());
                Ok(())
            }
        };

        if let Err(e) = outcome {
            println!("{} {}", "❌ Error:".bright_red().bold(), e);
        }
    }

    Ok(())
}

fn prompt(label: &str) -> ToolResult<String> {
    print!("{}", label.bright_yellow());
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

fn print_response(status: reqwest::StatusCode, body: &Value) -> ToolResult<()> {
    let label = format!("📥 {}", status);
    if status.is_success() {
        println!("{}", label.bright_green());
    } else {
        println!("{}", label.bright_red());
    }
    println!("{}", serde_json::to_string_pretty(body)?);
    Ok(())
}

impl Session {
    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&String>,
        body: Option<Value>,
    ) -> ToolResult<(reqwest::StatusCode, Value)> {
        let url = format!("{}{}", self.base_url, path);
        println!("{} {} {}", "📤".bright_blue(), method, url);

        let mut request = self.http.request(method, &url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        print_response(status, &body)?;
        Ok((status, body))
    }
}

async fn health(session: &Session) -> ToolResult<()> {
    session.send(reqwest::Method::GET, "/health", None, None).await?;
    Ok(())
}

async fn client_login(session: &mut Session) -> ToolResult<()> {
    let phone = prompt("Teléfono (07XXXXXXXX): ")?;
    let (status, _) = session
        .send(
            reqwest::Method::POST,
            "/api/client/register",
            None,
            Some(json!({ "phone": phone })),
        )
        .await?;
    if !status.is_success() {
        return Ok(());
    }

    let otp = prompt("Código OTP recibido: ")?;
    let (status, body) = session
        .send(
            reqwest::Method::POST,
            "/api/client/verify",
            None,
            Some(json!({ "phone": phone, "otp": otp })),
        )
        .await?;

    if status.is_success() {
        session.client_token = body["data"]["token"].as_str().map(str::to_string);
        println!("{}", "✅ Token de cliente guardado".bright_green());
    }
    Ok(())
}

async fn create_delivery(session: &Session) -> ToolResult<()> {
    let Some(token) = session.client_token.as_ref() else {
        println!("{}", "⚠️ Primero inicia sesión como cliente (opción 2)".bright_yellow());
        return Ok(());
    };

    let body = json!({
        "service_type": "delivery",
        "pickup": { "address": "Kenyatta Avenue, Nairobi", "lat": -1.2921, "lng": 36.8219 },
        "dropoff": { "address": "South B, Nairobi", "lat": -1.3032, "lng": 36.8442 },
        "package_description": "Documentos de prueba"
    });
    session
        .send(reqwest::Method::POST, "/api/trips", Some(token), Some(body))
        .await?;
    Ok(())
}

async fn wallet(session: &Session) -> ToolResult<()> {
    let Some(token) = session.client_token.as_ref() else {
        println!("{}", "⚠️ Primero inicia sesión como cliente (opción 2)".bright_yellow());
        return Ok(());
    };

    let amount = prompt("Monto a cargar en KES (vacío para solo consultar): ")?;
    if !amount.is_empty() {
        let amount: i64 = amount.parse()?;
        session
            .send(
                reqwest::Method::POST,
                "/api/wallet/load",
                Some(token),
                Some(json!({ "amount": amount, "reference": "testing-tool" })),
            )
            .await?;
    }

    session
        .send(reqwest::Method::GET, "/api/wallet/balance", Some(token), None)
        .await?;
    Ok(())
}

async fn rider_login(session: &mut Session) -> ToolResult<()> {
    let email = prompt("Email: ")?;
    let password = prompt("Password: ")?;

    let (status, body) = session
        .send(
            reqwest::Method::POST,
            "/api/rider/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await?;

    if status.is_success() {
        session.rider_token = body["data"]["token"].as_str().map(str::to_string);
        println!("{}", "✅ Token de rider guardado".bright_green());
    }
    Ok(())
}

async fn available_trips(session: &Session) -> ToolResult<()> {
    let Some(token) = session.rider_token.as_ref() else {
        println!("{}", "⚠️ Primero inicia sesión como rider (opción 5)".bright_yellow());
        return Ok(());
    };

    session
        .send(
            reqwest::Method::GET,
            "/api/trips/available?lat=-1.2921&lng=36.8219",
            Some(token),
            None,
        )
        .await?;
    Ok(())
}

async fn accept_trip(session: &Session) -> ToolResult<()> {
    let Some(token) = session.rider_token.as_ref() else {
        println!("{}", "⚠️ Primero inicia sesión como rider (opción 5)".bright_yellow());
        return Ok(());
    };

    let trip_id = prompt("ID del viaje: ")?;
    session
        .send(
            reqwest::Method::POST,
            &format!("/api/trips/{}/accept", trip_id),
            Some(token),
            None,
        )
        .await?;
    Ok(())
}
