// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! shared between the `NutriPlan` client library and its front ends.
//! This module defines the session identity, the diet model and the
//! JSON envelopes exchanged with the REST backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated identity, if any, known to the client.
///
/// Persisted as `{id, nombre, email}` so a stored copy stays readable by every
/// auth backend variant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Provider-assigned opaque identifier
    pub id: String,
    /// Name shown to the user
    #[serde(rename = "nombre")]
    pub display_name: String,
    /// Login email
    pub email: String,
}

impl Session {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            email: email.into(),
        }
    }

    /// Build a session from a provider profile, falling back to the email
    /// when the provider has no display name.
    pub fn from_profile(id: impl Into<String>, email: impl Into<String>, display_name: Option<String>) -> Self {
        let email = email.into();
        let display_name = display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| email.clone());
        Self {
            id: id.into(),
            display_name,
            email,
        }
    }
}

/// A single meal inside a day of the weekly menu
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Meal {
    /// e.g. "Ensalada César"
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "calorias")]
    pub calories: u32,
    /// e.g. "Almuerzo", "Desayuno", "Cena"
    #[serde(rename = "tipo")]
    pub kind: String,
}

impl Meal {
    pub fn new(name: impl Into<String>, calories: u32, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calories,
            kind: kind.into(),
        }
    }
}

/// The meals planned for one day of the week
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DailyMenu {
    #[serde(rename = "dia")]
    pub day: String,
    #[serde(rename = "comidas", default)]
    pub meals: Vec<Meal>,
}

impl DailyMenu {
    pub fn new(day: impl Into<String>, meals: Vec<Meal>) -> Self {
        Self {
            day: day.into(),
            meals,
        }
    }
}

/// Ordered list of daily menus, unique by day.
///
/// Inserting a day that is already present appends the new meals to the first
/// occurrence instead of adding a second entry. Days need not cover the whole
/// week; a missing day has no meals planned.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(from = "Vec<DailyMenu>", into = "Vec<DailyMenu>")]
pub struct WeeklyMenu {
    days: Vec<DailyMenu>,
}

impl WeeklyMenu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn days(&self) -> &[DailyMenu] {
        &self.days
    }

    pub fn day(&self, day: &str) -> Option<&DailyMenu> {
        self.days.iter().find(|d| d.day == day)
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    /// Insert a day, coalescing with an existing entry for the same day.
    pub fn insert_day(&mut self, menu: DailyMenu) {
        match self.days.iter_mut().find(|d| d.day == menu.day) {
            Some(existing) => existing.meals.extend(menu.meals),
            None => self.days.push(menu),
        }
    }

    /// Add one meal to `day`, creating the day entry if needed.
    pub fn add_meal(&mut self, day: &str, meal: Meal) {
        self.insert_day(DailyMenu::new(day, vec![meal]));
    }

    /// Sum of the calories of every planned meal
    pub fn total_calories(&self) -> u64 {
        self.days
            .iter()
            .flat_map(|d| d.meals.iter())
            .map(|m| u64::from(m.calories))
            .sum()
    }
}

impl From<Vec<DailyMenu>> for WeeklyMenu {
    fn from(days: Vec<DailyMenu>) -> Self {
        let mut menu = WeeklyMenu::new();
        for day in days {
            menu.insert_day(day);
        }
        menu
    }
}

impl From<WeeklyMenu> for Vec<DailyMenu> {
    fn from(menu: WeeklyMenu) -> Self {
        menu.days
    }
}

/// A named diet plan
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Diet {
    /// Server-assigned identifier
    #[serde(rename = "_id")]
    pub id: String,
    /// Creator, absent for public sample diets
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "fechaInicio")]
    pub start_date: DateTime<Utc>,
    #[serde(rename = "fechaFin", default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(rename = "caloriasTotales", default, skip_serializing_if = "Option::is_none")]
    pub total_calories: Option<u32>,
    #[serde(rename = "menuSemanal", default)]
    pub weekly_menu: WeeklyMenu,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Diet {
    /// Merge every field present in `patch` into this record.
    pub fn apply(&mut self, patch: DietPatch) {
        if let Some(owner_id) = patch.owner_id {
            self.owner_id = Some(owner_id);
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = Some(end_date);
        }
        if let Some(total_calories) = patch.total_calories {
            self.total_calories = Some(total_calories);
        }
        if let Some(weekly_menu) = patch.weekly_menu {
            self.weekly_menu = weekly_menu;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = Some(updated_at);
        }
    }
}

/// Payload for creating a diet; the server assigns the id
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewDiet {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "fechaInicio")]
    pub start_date: DateTime<Utc>,
    #[serde(rename = "fechaFin", default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(rename = "caloriasTotales", default, skip_serializing_if = "Option::is_none")]
    pub total_calories: Option<u32>,
    #[serde(rename = "menuSemanal", default)]
    pub weekly_menu: WeeklyMenu,
}

impl NewDiet {
    pub fn new(name: impl Into<String>, start_date: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            start_date,
            end_date: None,
            total_calories: None,
            weekly_menu: WeeklyMenu::new(),
        }
    }
}

/// Partial update of a diet. Only the fields that are `Some` are sent and merged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct DietPatch {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(rename = "nombre", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "fechaInicio", default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(rename = "fechaFin", default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(rename = "caloriasTotales", default, skip_serializing_if = "Option::is_none")]
    pub total_calories: Option<u32>,
    #[serde(rename = "menuSemanal", default, skip_serializing_if = "Option::is_none")]
    pub weekly_menu: Option<WeeklyMenu>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl DietPatch {
    pub fn weekly_menu(menu: WeeklyMenu) -> Self {
        Self {
            weekly_menu: Some(menu),
            ..Self::default()
        }
    }
}

impl From<Diet> for DietPatch {
    fn from(diet: Diet) -> Self {
        Self {
            id: Some(diet.id),
            owner_id: diet.owner_id,
            name: Some(diet.name),
            start_date: Some(diet.start_date),
            end_date: diet.end_date,
            total_calories: diet.total_calories,
            weekly_menu: Some(diet.weekly_menu),
            updated_at: diet.updated_at,
        }
    }
}

/// JSON envelopes exchanged with the REST backend
pub mod wire {
    use super::{Diet, DietPatch, Session};
    use serde::{Deserialize, Serialize};

    /// Body of `POST /auth/login`
    #[derive(Serialize, Deserialize, Debug, Clone)]
    pub struct LoginRequest {
        pub email: String,
        pub password: String,
    }

    /// Body of `POST /auth/register`
    #[derive(Serialize, Deserialize, Debug, Clone)]
    pub struct RegisterRequest {
        pub email: String,
        pub password: String,
        #[serde(rename = "nombre", skip_serializing_if = "Option::is_none")]
        pub name: Option<String>,
    }

    /// User record returned by login and register
    #[derive(Serialize, Deserialize, Debug, Clone)]
    pub struct AuthUser {
        #[serde(rename = "_id")]
        pub id: String,
        pub email: String,
        #[serde(default)]
        pub nombre: Option<String>,
    }

    impl From<AuthUser> for Session {
        fn from(user: AuthUser) -> Self {
            Session::from_profile(user.id, user.email, user.nombre)
        }
    }

    /// Response of `GET /auth/perfil`
    #[derive(Serialize, Deserialize, Debug, Clone)]
    pub struct ProfileResponse {
        pub usuario: Session,
    }

    /// Response of the diet listing endpoints
    #[derive(Serialize, Deserialize, Debug, Clone, Default)]
    pub struct DietList {
        #[serde(default)]
        pub dietas: Vec<Diet>,
    }

    /// Response of `PUT /diet/:id`
    #[derive(Serialize, Deserialize, Debug, Clone)]
    pub struct UpdatedDiet {
        #[serde(rename = "dietaActualizada")]
        pub diet: DietPatch,
    }
}
