// Shared fixtures for the integration tests.
#![allow(dead_code)]

use servidores_report::{DatasetKind, Record, RecordStore, Schema};

pub fn headcount_store(records: Vec<Record>) -> RecordStore {
    RecordStore::new(Schema::for_kind(DatasetKind::Headcount, false, false), records)
}

pub fn overtime_store(records: Vec<Record>) -> RecordStore {
    RecordStore::new(Schema::for_kind(DatasetKind::Overtime, false, true), records)
}

/// The worked example: R1 once in 2020 and three times in 2021, R2 once in 2021.
pub fn saude_scenario() -> RecordStore {
    let mut records = vec![Record::new("Saúde", "R1", "Enfermeiro", 2020)];
    for _ in 0..3 {
        records.push(Record::new("Saúde", "R1", "Enfermeiro", 2021));
    }
    records.push(Record::new("Saúde", "R2", "Médico", 2021));
    headcount_store(records)
}

/// A few departments over four years with growth, decline and ties.
pub fn multi_department() -> RecordStore {
    let mut records = Vec::new();
    let plan: &[(&str, &str, &str, [usize; 4])] = &[
        ("Saúde", "R1", "Enfermeiro", [4, 5, 6, 7]),
        ("Saúde", "R2", "Médico", [6, 3, 8, 2]),
        ("Saúde", "R3", "Agente", [2, 2, 2, 2]),
        ("Educação", "R4", "Professor", [10, 9, 9, 8]),
        ("Educação", "R3", "Agente", [1, 0, 0, 1]),
        ("Obras", "R5", "Engenheiro", [0, 1, 1, 0]),
    ];
    for (dept, code, desc, counts) in plan {
        for (i, n) in counts.iter().enumerate() {
            for _ in 0..*n {
                records.push(Record::new(*dept, *code, *desc, 2019 + i as i32));
            }
        }
    }
    headcount_store(records)
}

pub const HEADCOUNT_CSV: &str = "Secretaria,Ano,Cargo,Descrição_Cargo,Mes\n\
Saúde,2020,R1,Enfermeiro,1\n\
Saúde,2021,R1,Enfermeiro,2\n\
Saúde,2021,R1,Enfermeiro,2\n\
Saúde,2021,R2,Médico,3\n\
Educação,2021,R4,Professor,15\n";

pub const OVERTIME_CSV: &str = "Ano,Matricula,Secretaria,Cod_Cargo,Cargo,Horas_realizadas\n\
2022,001,Saúde,10,Médico,10.5\n\
2022,002,Saúde,20,Motorista,40\n\
2023,001,Saúde,10,Médico,\n\
2023,003,Obras,30,Engenheiro,\"12,5\"\n";
