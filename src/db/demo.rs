//! Demo manufacturing database.
//!
//! When no connection string is configured the server falls back to a local
//! SQLite file. On first use the file is created and populated with a fixed
//! set of factories, lines, machines, staff, suppliers and parts, plus
//! generated work orders, inspections, purchase orders and maintenance logs.
//! Generated rows come from a seeded RNG so every fresh file is alike apart
//! from dates, which are relative to the day of creation.

use chrono::{Local, NaiveDate, TimeDelta};
use rand::distributions::WeightedIndex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sqlx::{Executor, Sqlite, SqlitePool, Transaction};
use tracing::info;

/// Tables created in the demo database.
pub const TABLES: [&str; 11] = [
    "factories",
    "production_lines",
    "machines",
    "employees",
    "suppliers",
    "parts",
    "purchase_orders",
    "work_orders",
    "work_order_parts",
    "quality_inspections",
    "maintenance_logs",
];

const SEED: u64 = 0x4d46_4744_454d_4f31;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS factories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    location TEXT NOT NULL,
    country TEXT NOT NULL,
    established_year INTEGER,
    total_area_sqm REAL,
    active BOOLEAN DEFAULT 1
);

CREATE TABLE IF NOT EXISTS production_lines (
    id INTEGER PRIMARY KEY,
    factory_id INTEGER NOT NULL REFERENCES factories(id),
    name TEXT NOT NULL,
    product_type TEXT NOT NULL,
    capacity_units_per_day INTEGER,
    active BOOLEAN DEFAULT 1
);

CREATE TABLE IF NOT EXISTS machines (
    id INTEGER PRIMARY KEY,
    production_line_id INTEGER NOT NULL REFERENCES production_lines(id),
    name TEXT NOT NULL,
    model TEXT NOT NULL,
    manufacturer TEXT NOT NULL,
    installed_date TEXT,
    last_maintenance_date TEXT,
    status TEXT CHECK(status IN ('operational','maintenance','offline')) DEFAULT 'operational',
    age_years REAL,
    cumulative_downtime_hours REAL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS employees (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    role TEXT NOT NULL,
    factory_id INTEGER NOT NULL REFERENCES factories(id),
    shift TEXT CHECK(shift IN ('morning','afternoon','night')),
    hire_date TEXT,
    active BOOLEAN DEFAULT 1
);

CREATE TABLE IF NOT EXISTS suppliers (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    country TEXT NOT NULL,
    contact_email TEXT,
    lead_time_days INTEGER,
    reliability_score REAL CHECK(reliability_score BETWEEN 0 AND 10)
);

CREATE TABLE IF NOT EXISTS parts (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    sku TEXT UNIQUE NOT NULL,
    category TEXT NOT NULL,
    unit_cost REAL,
    stock_quantity INTEGER DEFAULT 0,
    reorder_threshold INTEGER DEFAULT 50,
    supplier_id INTEGER REFERENCES suppliers(id)
);

CREATE TABLE IF NOT EXISTS purchase_orders (
    id INTEGER PRIMARY KEY,
    supplier_id INTEGER NOT NULL REFERENCES suppliers(id),
    part_id INTEGER NOT NULL REFERENCES parts(id),
    quantity INTEGER NOT NULL,
    unit_price REAL NOT NULL,
    order_date TEXT NOT NULL,
    expected_delivery TEXT,
    actual_delivery TEXT,
    status TEXT CHECK(status IN ('pending','shipped','delivered','cancelled')) DEFAULT 'pending'
);

CREATE TABLE IF NOT EXISTS work_orders (
    id INTEGER PRIMARY KEY,
    production_line_id INTEGER NOT NULL REFERENCES production_lines(id),
    operator_id INTEGER NOT NULL REFERENCES employees(id),
    product_name TEXT NOT NULL,
    quantity_target INTEGER NOT NULL,
    quantity_produced INTEGER DEFAULT 0,
    start_date TEXT,
    end_date TEXT,
    status TEXT CHECK(status IN ('planned','in_progress','completed','cancelled')) DEFAULT 'planned',
    priority TEXT CHECK(priority IN ('low','medium','high','critical')) DEFAULT 'medium'
);

CREATE TABLE IF NOT EXISTS work_order_parts (
    id INTEGER PRIMARY KEY,
    work_order_id INTEGER NOT NULL REFERENCES work_orders(id),
    part_id INTEGER NOT NULL REFERENCES parts(id),
    quantity_required INTEGER NOT NULL,
    quantity_used INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS quality_inspections (
    id INTEGER PRIMARY KEY,
    work_order_id INTEGER NOT NULL REFERENCES work_orders(id),
    inspector_id INTEGER NOT NULL REFERENCES employees(id),
    inspection_date TEXT NOT NULL,
    result TEXT CHECK(result IN ('pass','fail','conditional_pass')) NOT NULL,
    defect_type TEXT,
    defect_count INTEGER DEFAULT 0,
    notes TEXT
);

CREATE TABLE IF NOT EXISTS maintenance_logs (
    id INTEGER PRIMARY KEY,
    machine_id INTEGER NOT NULL REFERENCES machines(id),
    technician_id INTEGER NOT NULL REFERENCES employees(id),
    maintenance_date TEXT NOT NULL,
    maintenance_type TEXT CHECK(maintenance_type IN ('preventive','corrective','emergency')) NOT NULL,
    downtime_hours REAL NOT NULL,
    cost REAL,
    description TEXT,
    resolved BOOLEAN DEFAULT 1
);
"#;

// (id, name, location, country, established_year, total_area_sqm)
const FACTORIES: [(i64, &str, &str, &str, i64, f64); 5] = [
    (1, "NordSteel Leipzig", "Leipzig", "Germany", 1987, 45000.0),
    (2, "PolyFab Milano", "Milan", "Italy", 1995, 32000.0),
    (3, "AeroTech Toulouse", "Toulouse", "France", 2001, 28000.0),
    (4, "PrecisionWorks Gdańsk", "Gdańsk", "Poland", 2008, 19000.0),
    (5, "MetalCore Monterrey", "Monterrey", "Mexico", 2012, 22000.0),
];

// (id, factory_id, name, product_type, capacity_units_per_day)
const PRODUCTION_LINES: [(i64, i64, &str, &str, i64); 10] = [
    (1, 1, "Steel Casting Line A", "Structural Steel", 800),
    (2, 1, "Steel Casting Line B", "Flat Rolled Steel", 600),
    (3, 1, "Quality Control Line", "Inspection", 1200),
    (4, 2, "Polymer Extrusion Line 1", "PVC Profiles", 500),
    (5, 2, "Polymer Extrusion Line 2", "HDPE Pipes", 400),
    (6, 3, "Fuselage Assembly A", "Aircraft Fuselage", 10),
    (7, 3, "Wing Component Line", "Wing Structures", 8),
    (8, 4, "CNC Machining Center", "Precision Parts", 200),
    (9, 4, "Surface Treatment Line", "Coated Parts", 300),
    (10, 5, "Stamping Press Line", "Metal Stampings", 1000),
];

struct Machine {
    id: i64,
    line_id: i64,
    name: &'static str,
    model: &'static str,
    manufacturer: &'static str,
    installed: &'static str,
    last_maintenance: &'static str,
    status: &'static str,
    age_years: f64,
    downtime_hours: f64,
}

macro_rules! machine {
    ($id:expr, $line:expr, $name:expr, $model:expr, $mfr:expr, $inst:expr, $maint:expr, $status:expr, $age:expr, $down:expr) => {
        Machine {
            id: $id,
            line_id: $line,
            name: $name,
            model: $model,
            manufacturer: $mfr,
            installed: $inst,
            last_maintenance: $maint,
            status: $status,
            age_years: $age,
            downtime_hours: $down,
        }
    };
}

const MACHINES: [Machine; 16] = [
    machine!(1, 1, "Arc Furnace #1", "EAF-500", "Siemens", "2010-03-15", "2024-10-01", "operational", 14.0, 120.0),
    machine!(2, 1, "Continuous Caster A", "CC-3000", "Danieli", "2012-06-20", "2024-11-15", "operational", 12.0, 80.0),
    machine!(3, 2, "Rolling Mill X1", "RM-800", "SMS Group", "2015-01-10", "2024-09-20", "operational", 9.5, 65.0),
    machine!(4, 2, "Coiling Machine B2", "CM-200", "Primetals", "2018-04-05", "2024-12-01", "operational", 6.5, 30.0),
    machine!(5, 3, "Ultrasonic Tester", "UT-Pro X", "Olympus", "2020-07-11", "2025-01-10", "operational", 4.0, 10.0),
    machine!(6, 4, "Extruder PE-90", "PE-90L", "Krauss-Maffei", "2014-09-30", "2024-08-01", "maintenance", 10.0, 200.0),
    machine!(7, 4, "Haul-Off Unit H4", "HO-400", "Battenfeld", "2017-02-14", "2024-10-15", "operational", 7.5, 55.0),
    machine!(8, 5, "Extruder PE-120", "PE-120H", "Krauss-Maffei", "2019-11-25", "2025-01-05", "operational", 5.0, 25.0),
    machine!(9, 6, "Riveting Robot RR-1", "RR-700", "KUKA", "2016-05-20", "2024-12-20", "operational", 8.5, 90.0),
    machine!(10, 6, "Panel Joining Unit", "PJ-200", "Broetje", "2018-08-01", "2025-01-20", "operational", 6.5, 45.0),
    machine!(11, 7, "Spar Drilling Machine", "SDM-5X", "Dornier", "2013-03-10", "2024-07-15", "offline", 11.5, 350.0),
    machine!(12, 8, "CNC Lathe L1", "Mazak-QT25", "Mazak", "2021-01-15", "2025-01-25", "operational", 4.0, 15.0),
    machine!(13, 8, "5-Axis Mill M3", "DMU-95", "DMG Mori", "2022-06-10", "2025-02-01", "operational", 2.5, 5.0),
    machine!(14, 9, "Shot Blast Unit SB2", "SB-600", "Wheelabrator", "2016-10-20", "2024-09-10", "operational", 8.0, 70.0),
    machine!(15, 10, "Hydraulic Press P1", "HP-1600T", "Schuler", "2017-07-05", "2024-11-20", "operational", 7.5, 95.0),
    machine!(16, 10, "Stamping Die System", "SDS-800", "Trumpf", "2020-03-15", "2025-01-15", "operational", 4.5, 20.0),
];

const EMPLOYEE_NAMES: [&str; 25] = [
    "Lukas Becker",
    "Maria Rossi",
    "Jean Dupont",
    "Anna Kowalski",
    "Carlos Mendez",
    "Sophie Laurent",
    "Piotr Nowak",
    "Elena Müller",
    "Ricardo García",
    "Hana Novak",
    "Thomas Braun",
    "Isabela Silva",
    "Marek Wójcik",
    "Claire Bernard",
    "Diego Torres",
    "Monika Krol",
    "Stefan Huber",
    "Fatima Benali",
    "Andrei Popescu",
    "Laura Esposito",
    "Hans Zimmermann",
    "Katarzyna Dąbrowska",
    "Miguel Fernández",
    "Sara Bianchi",
    "Robert Klein",
];

const ROLES: [&str; 6] = [
    "Operator",
    "Senior Operator",
    "Inspector",
    "Technician",
    "Shift Supervisor",
    "Quality Engineer",
];

const SHIFTS: [&str; 3] = ["morning", "afternoon", "night"];

// (id, name, country, contact_email, lead_time_days, reliability_score)
const SUPPLIERS: [(i64, &str, &str, &str, i64, f64); 8] = [
    (1, "ThyssenKrupp Materials", "Germany", "orders@tk-materials.de", 14, 9.1),
    (2, "SABIC Europe", "Netherlands", "supply@sabic.eu", 21, 8.4),
    (3, "Hexcel Composites", "USA", "orders@hexcel.com", 28, 8.9),
    (4, "Fastener World", "China", "sales@fastenerworld.cn", 35, 6.2),
    (5, "Lubrizol Additives", "USA", "orders@lubrizol.com", 10, 9.5),
    (6, "Sandvik Tooling", "Sweden", "tools@sandvik.com", 7, 9.7),
    (7, "IGS Gaskets", "Italy", "info@igsgaskets.it", 18, 7.8),
    (8, "Nippon Steel Supply", "Japan", "export@nippon-ss.jp", 25, 8.6),
];

// (id, name, sku, category, unit_cost, stock_quantity, reorder_threshold, supplier_id)
const PARTS: [(i64, &str, &str, &str, f64, i64, i64, i64); 12] = [
    (1, "High-Carbon Steel Billet", "SKU-1001", "Raw Material", 480.00, 320, 100, 1),
    (2, "PVC Resin Grade K67", "SKU-1002", "Raw Material", 120.00, 180, 80, 2),
    (3, "Carbon Fiber Prepreg", "SKU-1003", "Composite", 950.00, 45, 20, 3),
    (4, "M12 Hex Bolt (box/100)", "SKU-2001", "Fastener", 18.50, 850, 200, 4),
    (5, "M8 Lock Nut (box/100)", "SKU-2002", "Fastener", 9.20, 620, 200, 4),
    (6, "Industrial Lubricant 5L", "SKU-3001", "Consumable", 45.00, 95, 40, 5),
    (7, "Tungsten Carbide Insert", "SKU-3002", "Tooling", 230.00, 60, 25, 6),
    (8, "Hydraulic Seal Kit", "SKU-3003", "Maintenance", 88.00, 35, 30, 7),
    (9, "HDPE Granules 25kg", "SKU-1004", "Raw Material", 85.00, 260, 80, 2),
    (10, "Aluminum Sheet 2mm", "SKU-1005", "Raw Material", 310.00, 140, 50, 8),
    (11, "Titanium Fastener Kit", "SKU-2003", "Fastener", 175.00, 28, 20, 4),
    (12, "Welding Wire ER70S-6", "SKU-3004", "Consumable", 62.00, 110, 50, 1),
];

const PO_STATUSES: [&str; 6] = [
    "pending",
    "shipped",
    "delivered",
    "delivered",
    "delivered",
    "cancelled",
];

/// Product built on each production line, indexed by line id - 1.
const LINE_PRODUCTS: [&str; 10] = [
    "HEA 200 Beam",
    "Hot-Rolled Coil",
    "HEA 200 Beam",
    "PVC Window Profile",
    "HDPE Water Pipe 110mm",
    "Fuselage Panel Section 12",
    "Wing Rib Assembly",
    "Precision Shaft 40mm",
    "Brake Disc Housing",
    "Metal Stamping Bracket A",
];

const WO_STATUSES: [&str; 6] = [
    "planned",
    "in_progress",
    "completed",
    "completed",
    "completed",
    "cancelled",
];

const PRIORITIES: [&str; 4] = ["low", "medium", "high", "critical"];

const DEFECT_TYPES: [Option<&str>; 10] = [
    Some("Dimensional deviation"),
    Some("Surface crack"),
    Some("Porosity"),
    Some("Delamination"),
    Some("Weld defect"),
    Some("Hardness out of spec"),
    Some("Paint adhesion failure"),
    None,
    None,
    None,
];

const INSPECTION_RESULTS: [(&str, u32); 3] = [("pass", 70), ("fail", 15), ("conditional_pass", 15)];

const MAINTENANCE_TYPES: [(&str, u32); 3] =
    [("preventive", 50), ("corrective", 35), ("emergency", 15)];

const MAINTENANCE_DESCRIPTIONS: [&str; 10] = [
    "Routine lubrication and belt replacement",
    "Bearing replacement after vibration alert",
    "Emergency shutdown due to overheating, coolant replaced",
    "Calibration and sensor alignment",
    "Hydraulic seal replacement",
    "Conveyor chain replacement",
    "Electrical fault diagnosis and repair",
    "Scheduled annual inspection",
    "Motor winding repair",
    "Control panel firmware update and diagnostics",
];

const PURCHASE_ORDER_COUNT: i64 = 60;
const WORK_ORDER_COUNT: i64 = 200;
const INSPECTION_COUNT: i64 = 500;
const MAINTENANCE_LOG_COUNT: i64 = 150;

/// Whether the demo tables already exist in this database.
pub async fn is_seeded(pool: &SqlitePool) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'factories'",
    )
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// Create the demo schema and insert all rows in one transaction.
pub async fn seed(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut rng = StdRng::seed_from_u64(SEED);
    let dates = DateSource::new(Local::now().date_naive());

    let mut tx = pool.begin().await?;
    (&mut *tx).execute(sqlx::raw_sql(SCHEMA)).await?;

    insert_reference_data(&mut tx, &mut rng, &dates).await?;
    insert_purchase_orders(&mut tx, &mut rng, &dates).await?;
    insert_work_orders(&mut tx, &mut rng, &dates).await?;
    insert_inspections(&mut tx, &mut rng, &dates).await?;
    insert_maintenance_logs(&mut tx, &mut rng, &dates).await?;

    tx.commit().await?;
    info!(tables = TABLES.len(), "Demo database seeded");
    Ok(())
}

/// Produces ISO dates relative to a fixed day.
struct DateSource {
    today: NaiveDate,
}

impl DateSource {
    fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// A random day between `oldest` and `newest` days ago, inclusive.
    fn days_ago(&self, rng: &mut StdRng, oldest: i64, newest: i64) -> NaiveDate {
        self.today - TimeDelta::days(rng.gen_range(newest..=oldest))
    }
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn weighted<'a>(rng: &mut StdRng, items: &[(&'a str, u32)]) -> &'a str {
    match WeightedIndex::new(items.iter().map(|(_, w)| *w)) {
        Ok(dist) => items[rng.sample(&dist)].0,
        Err(_) => items.first().map(|(v, _)| *v).unwrap_or_default(),
    }
}

async fn insert_reference_data(
    tx: &mut Transaction<'_, Sqlite>,
    rng: &mut StdRng,
    dates: &DateSource,
) -> Result<(), sqlx::Error> {
    for (id, name, location, country, year, area) in FACTORIES {
        sqlx::query("INSERT INTO factories VALUES (?, ?, ?, ?, ?, ?, 1)")
            .bind(id)
            .bind(name)
            .bind(location)
            .bind(country)
            .bind(year)
            .bind(area)
            .execute(&mut **tx)
            .await?;
    }

    for (id, factory_id, name, product_type, capacity) in PRODUCTION_LINES {
        sqlx::query("INSERT INTO production_lines VALUES (?, ?, ?, ?, ?, 1)")
            .bind(id)
            .bind(factory_id)
            .bind(name)
            .bind(product_type)
            .bind(capacity)
            .execute(&mut **tx)
            .await?;
    }

    for m in &MACHINES {
        sqlx::query("INSERT INTO machines VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)")
            .bind(m.id)
            .bind(m.line_id)
            .bind(m.name)
            .bind(m.model)
            .bind(m.manufacturer)
            .bind(m.installed)
            .bind(m.last_maintenance)
            .bind(m.status)
            .bind(m.age_years)
            .bind(m.downtime_hours)
            .execute(&mut **tx)
            .await?;
    }

    for (index, name) in EMPLOYEE_NAMES.iter().enumerate() {
        let factory_id = rng.gen_range(1..=FACTORIES.len() as i64);
        let role = pick(rng, &ROLES);
        let shift = pick(rng, &SHIFTS);
        let hire_date = iso(dates.days_ago(rng, 3000, 365));
        sqlx::query("INSERT INTO employees VALUES (?, ?, ?, ?, ?, ?, 1)")
            .bind(index as i64 + 1)
            .bind(*name)
            .bind(role)
            .bind(factory_id)
            .bind(shift)
            .bind(hire_date)
            .execute(&mut **tx)
            .await?;
    }

    for (id, name, country, email, lead_time, reliability) in SUPPLIERS {
        sqlx::query("INSERT INTO suppliers VALUES (?, ?, ?, ?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(country)
            .bind(email)
            .bind(lead_time)
            .bind(reliability)
            .execute(&mut **tx)
            .await?;
    }

    for (id, name, sku, category, cost, stock, threshold, supplier_id) in PARTS {
        sqlx::query("INSERT INTO parts VALUES (?, ?, ?, ?, ?, ?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(sku)
            .bind(category)
            .bind(cost)
            .bind(stock)
            .bind(threshold)
            .bind(supplier_id)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

async fn insert_purchase_orders(
    tx: &mut Transaction<'_, Sqlite>,
    rng: &mut StdRng,
    dates: &DateSource,
) -> Result<(), sqlx::Error> {
    for id in 1..=PURCHASE_ORDER_COUNT {
        let supplier_id = rng.gen_range(1..=SUPPLIERS.len() as i64);
        let part_id = rng.gen_range(1..=PARTS.len() as i64);
        let quantity = rng.gen_range(50..=500i64);
        let unit_price = round_to(rng.gen_range(10.0..600.0), 2);
        let ordered = dates.days_ago(rng, 180, 10);
        let expected = ordered + TimeDelta::days(rng.gen_range(7..=40));
        let status = pick(rng, &PO_STATUSES);
        let delivered = (status == "delivered")
            .then(|| iso(expected + TimeDelta::days(rng.gen_range(-3..=15))));

        sqlx::query("INSERT INTO purchase_orders VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)")
            .bind(id)
            .bind(supplier_id)
            .bind(part_id)
            .bind(quantity)
            .bind(unit_price)
            .bind(iso(ordered))
            .bind(iso(expected))
            .bind(delivered)
            .bind(status)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn insert_work_orders(
    tx: &mut Transaction<'_, Sqlite>,
    rng: &mut StdRng,
    dates: &DateSource,
) -> Result<(), sqlx::Error> {
    let mut wop_id = 1i64;
    for id in 1..=WORK_ORDER_COUNT {
        let line_id = rng.gen_range(1..=PRODUCTION_LINES.len() as i64);
        let operator_id = rng.gen_range(1..=EMPLOYEE_NAMES.len() as i64);
        let product = LINE_PRODUCTS[(line_id - 1) as usize];
        let target = rng.gen_range(50..=500i64);
        let status = pick(rng, &WO_STATUSES);
        let produced = match status {
            "completed" => target,
            "in_progress" => rng.gen_range(0..=target),
            _ => 0,
        };
        let start = dates.days_ago(rng, 200, 5);
        let end = (status == "completed")
            .then(|| iso(start + TimeDelta::days(rng.gen_range(1..=14))));
        let priority = pick(rng, &PRIORITIES);

        sqlx::query("INSERT INTO work_orders VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)")
            .bind(id)
            .bind(line_id)
            .bind(operator_id)
            .bind(product)
            .bind(target)
            .bind(produced)
            .bind(iso(start))
            .bind(end)
            .bind(status)
            .bind(priority)
            .execute(&mut **tx)
            .await?;

        for _ in 0..rng.gen_range(1..=3) {
            let part_id = rng.gen_range(1..=PARTS.len() as i64);
            let required = rng.gen_range(5..=100i64);
            let used = if rng.r#gen::<f64>() > 0.2 {
                required
            } else {
                rng.gen_range(0..=required)
            };
            sqlx::query("INSERT INTO work_order_parts VALUES (?, ?, ?, ?, ?)")
                .bind(wop_id)
                .bind(id)
                .bind(part_id)
                .bind(required)
                .bind(used)
                .execute(&mut **tx)
                .await?;
            wop_id += 1;
        }
    }
    Ok(())
}

async fn insert_inspections(
    tx: &mut Transaction<'_, Sqlite>,
    rng: &mut StdRng,
    dates: &DateSource,
) -> Result<(), sqlx::Error> {
    for id in 1..=INSPECTION_COUNT {
        let work_order_id = rng.gen_range(1..=WORK_ORDER_COUNT);
        let inspector_id = rng.gen_range(1..=EMPLOYEE_NAMES.len() as i64);
        let date = dates.days_ago(rng, 200, 1);
        let result = weighted(rng, &INSPECTION_RESULTS);
        let defect = if result == "pass" {
            None
        } else {
            DEFECT_TYPES.choose(rng).copied().flatten()
        };
        let defect_count = if defect.is_some() {
            rng.gen_range(1..=8i64)
        } else {
            0
        };

        sqlx::query("INSERT INTO quality_inspections VALUES (?, ?, ?, ?, ?, ?, ?, NULL)")
            .bind(id)
            .bind(work_order_id)
            .bind(inspector_id)
            .bind(iso(date))
            .bind(result)
            .bind(defect)
            .bind(defect_count)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn insert_maintenance_logs(
    tx: &mut Transaction<'_, Sqlite>,
    rng: &mut StdRng,
    dates: &DateSource,
) -> Result<(), sqlx::Error> {
    for id in 1..=MAINTENANCE_LOG_COUNT {
        let machine_id = rng.gen_range(1..=MACHINES.len() as i64);
        let technician_id = rng.gen_range(1..=EMPLOYEE_NAMES.len() as i64);
        let date = dates.days_ago(rng, 365, 1);
        let kind = weighted(rng, &MAINTENANCE_TYPES);
        let emergency = kind == "emergency";
        let max_downtime = if emergency { 48.0 } else { 12.0 };
        let downtime = round_to(rng.gen_range(0.5..max_downtime), 1);
        let cost = round_to(rng.gen_range(200.0..15000.0), 2);
        let description = pick(rng, &MAINTENANCE_DESCRIPTIONS);
        let resolved = !emergency || rng.r#gen::<f64>() > 0.1;

        sqlx::query("INSERT INTO maintenance_logs VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)")
            .bind(id)
            .bind(machine_id)
            .bind(technician_id)
            .bind(iso(date))
            .bind(kind)
            .bind(downtime)
            .bind(cost)
            .bind(description)
            .bind(resolved)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_seed_creates_all_tables() {
        let pool = memory_pool().await;
        assert!(!is_seeded(&pool).await.unwrap());

        seed(&pool).await.unwrap();
        assert!(is_seeded(&pool).await.unwrap());

        for table in TABLES {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&pool)
                .await
                .unwrap();
            assert!(count > 0, "{} is empty", table);
        }
    }

    #[tokio::test]
    async fn test_seed_row_counts() {
        let pool = memory_pool().await;
        seed(&pool).await.unwrap();

        let count = |sql: &'static str| {
            let pool = pool.clone();
            async move {
                sqlx::query_scalar::<_, i64>(sql)
                    .fetch_one(&pool)
                    .await
                    .unwrap()
            }
        };
        assert_eq!(count("SELECT COUNT(*) FROM factories").await, 5);
        assert_eq!(count("SELECT COUNT(*) FROM machines").await, 16);
        assert_eq!(count("SELECT COUNT(*) FROM work_orders").await, 200);
        assert_eq!(count("SELECT COUNT(*) FROM quality_inspections").await, 500);
        assert_eq!(count("SELECT COUNT(*) FROM maintenance_logs").await, 150);
        assert_eq!(
            count("SELECT COUNT(*) FROM quality_inspections WHERE result = 'pass' AND defect_count > 0").await,
            0
        );
    }

    #[test]
    fn test_days_ago_stays_in_range() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let dates = DateSource::new(today);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let day = dates.days_ago(&mut rng, 30, 5);
            assert!(day <= today - TimeDelta::days(5));
            assert!(day >= today - TimeDelta::days(30));
        }
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.345, 1), 12.3);
        assert_eq!(round_to(12.346, 2), 12.35);
    }
}
